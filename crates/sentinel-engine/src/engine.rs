//! The triage engine: dedupe, enrichment, feature extraction,
//! clustering, and scoring. Deterministic given its inputs — no
//! randomness or wall-clock reads enter the pipeline.

use std::collections::{BTreeMap, BTreeSet};

use sentinel_core::config::{Config, PatternsConfig, ScoringConfig};
use sentinel_core::domain::{
    Notification, PatternCluster, PatternType, PullRequestRef, PullRequestSummary, RepositoryRef,
    ScoreBreakdown, ScoredPullRequest, SentinelError,
};
use sentinel_core::provider::{ListFailureRunsParams, Provider, PullRequestFile};

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "for", "from", "in", "is", "of", "on", "or", "the", "to", "with",
];

/// One unit of triage input: an identified PR, optionally already
/// carrying a provider-fetched summary and/or the notification that
/// surfaced it.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub repo: RepositoryRef,
    pub pr_number: u64,
    pub summary: Option<PullRequestSummary>,
    pub notification: Option<Notification>,
}

/// Output of [`run_triage`]: scored items and the clusters derived
/// from them. Downstream reports slice these; nothing re-sorts.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub items: Vec<ScoredPullRequest>,
    pub clusters: Vec<PatternCluster>,
}

fn dedupe_work_items(items: Vec<WorkItem>) -> Vec<WorkItem> {
    let mut by_key: BTreeMap<(String, u64), WorkItem> = BTreeMap::new();
    for item in items {
        let key = (item.repo.slug(), item.pr_number);
        match by_key.get(&key) {
            None => {
                by_key.insert(key, item);
            }
            Some(existing) => {
                if should_replace(existing, &item) {
                    by_key.insert(key, item);
                }
            }
        }
    }
    by_key.into_values().collect()
}

/// True if `candidate` should replace `existing` under the §4.3.1
/// collision rule: later `notification.updatedAt` wins; ties prefer
/// `unread = true`. An item with no notification never displaces one
/// that has one, and the first-seen item wins when neither has one.
fn should_replace(existing: &WorkItem, candidate: &WorkItem) -> bool {
    match (&existing.notification, &candidate.notification) {
        (Some(e), Some(c)) => {
            if c.updated_at != e.updated_at {
                c.updated_at > e.updated_at
            } else {
                c.unread && !e.unread
            }
        }
        (None, Some(_)) => true,
        (Some(_), None) => false,
        (None, None) => false,
    }
}

fn path_areas(files: &[PullRequestFile], path_depth: u32) -> Vec<String> {
    let mut set = BTreeSet::new();
    for file in files {
        let segments: Vec<&str> = file
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .take(path_depth as usize)
            .collect();
        if !segments.is_empty() {
            set.insert(segments.join("/"));
        }
    }
    set.into_iter().collect()
}

fn title_fingerprint(title: &str, patterns: &PatternsConfig) -> String {
    let normalized: String = title
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == ' ' { c } else { ' ' })
        .collect();

    let tokens: BTreeSet<String> = normalized
        .split_whitespace()
        .filter(|token| token.chars().count() >= patterns.min_title_token_length as usize)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(|token| token.to_string())
        .collect();

    let mut tokens: Vec<String> = tokens.into_iter().collect();
    tokens.truncate(patterns.max_title_tokens as usize);
    tokens.join(" ")
}

fn failure_signatures(runs: &[sentinel_core::domain::FailureRun]) -> Vec<String> {
    let mut set = BTreeSet::new();
    for run in runs {
        let workflow_label = run.workflow_path.clone().unwrap_or_else(|| run.workflow_name.clone());
        for job in &run.jobs {
            let step_label = job.failed_step_name.clone().unwrap_or_else(|| job.name.clone());
            set.insert(format!("{workflow_label}::{step_label}"));
        }
    }
    set.into_iter().collect()
}

struct Enriched {
    summary: PullRequestSummary,
    notification: Option<Notification>,
    unresolved_comments: u32,
    failing_runs: u32,
    path_areas: Vec<String>,
    title_fingerprint: String,
    failure_signatures: Vec<String>,
}

async fn enrich(
    item: &WorkItem,
    provider: &dyn Provider,
    auth_token: &str,
    config: &Config,
) -> sentinel_core::domain::Result<Enriched> {
    let summary = match &item.summary {
        Some(summary) => summary.clone(),
        None => {
            provider
                .get_pull_request_summary(&item.repo, item.pr_number, auth_token)
                .await?
        }
    };

    let unresolved = provider
        .list_unresolved_comments(&item.repo, item.pr_number, auth_token)
        .await?;
    let unresolved_comments = unresolved.iter().filter(|c| !c.resolved).count() as u32;

    let failure_runs = provider
        .list_failure_runs(
            ListFailureRunsParams {
                repo: item.repo.clone(),
                pr_number: Some(item.pr_number),
                run_id: None,
                max_runs: config.limits.max_failure_runs_per_pull_request,
            },
            auth_token,
        )
        .await?;
    let failing_runs = failure_runs.len() as u32;

    let files = provider
        .list_pull_request_files(
            &item.repo,
            item.pr_number,
            config.limits.max_files_per_pull_request,
            auth_token,
        )
        .await?;

    Ok(Enriched {
        path_areas: path_areas(&files, config.patterns.path_depth),
        title_fingerprint: title_fingerprint(&summary.title, &config.patterns),
        failure_signatures: failure_signatures(&failure_runs),
        unresolved_comments,
        failing_runs,
        summary,
        notification: item.notification.clone(),
    })
}

/// Build `(type, key) -> sorted unique member indices` for groups
/// meeting `min_cluster_size`, per §4.3.4.
fn build_groups(
    enriched: &[Enriched],
    min_cluster_size: u32,
) -> BTreeMap<(PatternType, String), Vec<usize>> {
    let mut groups: BTreeMap<(PatternType, String), BTreeSet<usize>> = BTreeMap::new();

    for (i, item) in enriched.iter().enumerate() {
        for area in &item.path_areas {
            groups
                .entry((PatternType::PathArea, area.clone()))
                .or_default()
                .insert(i);
        }
        if !item.title_fingerprint.is_empty() {
            groups
                .entry((PatternType::TitleFingerprint, item.title_fingerprint.clone()))
                .or_default()
                .insert(i);
        }
        for sig in &item.failure_signatures {
            groups
                .entry((PatternType::FailureSignature, sig.clone()))
                .or_default()
                .insert(i);
        }
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() as u32 >= min_cluster_size)
        .map(|(key, members)| (key, members.into_iter().collect()))
        .collect()
}

fn duplicate_peers(
    groups: &BTreeMap<(PatternType, String), Vec<usize>>,
    len: usize,
) -> Vec<u32> {
    let mut peers: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); len];
    for members in groups.values() {
        for &i in members {
            for &j in members {
                if i != j {
                    peers[i].insert(j);
                }
            }
        }
    }
    peers.into_iter().map(|set| set.len() as u32).collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn contribution(value: u32, cap: u32, weight: f64) -> f64 {
    if cap == 0 {
        return 0.0;
    }
    let clamped = value.min(cap) as f64;
    round3(clamped / cap as f64 * weight)
}

/// Run the full triage pipeline over `work_items`. Any provider failure
/// while enriching a PR aborts the whole call — callers running one
/// of the two snapshot sub-pipelines catch this and convert it into a
/// `SectionError`/dashboard error section rather than letting it
/// surface raw.
pub async fn run_triage(
    work_items: Vec<WorkItem>,
    config: &Config,
    provider: &dyn Provider,
    auth_token: &str,
) -> sentinel_core::domain::Result<ScoreResult> {
    let deduped = dedupe_work_items(work_items);

    let mut enriched = Vec::with_capacity(deduped.len());
    for item in &deduped {
        enriched.push(enrich(item, provider, auth_token, config).await?);
    }

    let groups = build_groups(&enriched, config.patterns.min_cluster_size);
    let peers = duplicate_peers(&groups, enriched.len());

    let weights = &config.scoring.weights;
    let caps = &config.scoring.caps;

    let mut items: Vec<ScoredPullRequest> = enriched
        .into_iter()
        .zip(peers)
        .map(|(item, duplicate_peers)| {
            let lines_changed = item.summary.lines_changed();
            let breakdown = ScoreBreakdown {
                failing_runs: contribution(item.failing_runs, caps.failing_runs, weights.failing_runs),
                unresolved_comments: contribution(
                    item.unresolved_comments,
                    caps.unresolved_comments,
                    weights.unresolved_comments,
                ),
                changed_files: contribution(
                    item.summary.changed_files,
                    caps.changed_files,
                    weights.changed_files,
                ),
                lines_changed: contribution(
                    lines_changed.min(u32::MAX as u64) as u32,
                    caps.lines_changed,
                    weights.lines_changed,
                ),
                duplicate_peers: contribution(
                    duplicate_peers,
                    caps.duplicate_peers,
                    weights.duplicate_peers,
                ),
            };
            let risk_points = round3(breakdown.sum());
            let priority_score = risk_points.round().clamp(0.0, 100.0) as u32;
            let trust_score = 100 - priority_score;

            ScoredPullRequest {
                summary: item.summary,
                path_areas: item.path_areas,
                title_fingerprint: item.title_fingerprint,
                failure_signatures: item.failure_signatures,
                unresolved_comments: item.unresolved_comments,
                failing_runs: item.failing_runs,
                duplicate_peers,
                breakdown,
                risk_points,
                priority_score,
                trust_score,
                notification: item.notification,
            }
        })
        .collect();

    sort_items(&mut items);

    let mut clusters: Vec<PatternCluster> = groups
        .into_iter()
        .map(|((pattern_type, key), _members_pre_sort)| {
            // re-resolve membership against the *sorted* `items` so
            // refs carry the final priority_score.
            let members: Vec<&ScoredPullRequest> = items
                .iter()
                .filter(|item| match pattern_type {
                    PatternType::PathArea => item.path_areas.contains(&key),
                    PatternType::TitleFingerprint => item.title_fingerprint == key,
                    PatternType::FailureSignature => item.failure_signatures.contains(&key),
                })
                .collect();
            let mut pull_requests: Vec<PullRequestRef> = members
                .into_iter()
                .map(|item| PullRequestRef {
                    repo: item.summary.repo.clone(),
                    number: item.summary.number,
                    priority_score: item.priority_score,
                })
                .collect();
            sort_pull_request_refs(&mut pull_requests);
            PatternCluster {
                pattern_type,
                key,
                size: pull_requests.len(),
                pull_requests,
            }
        })
        .collect();

    sort_clusters(&mut clusters);

    Ok(ScoreResult { items, clusters })
}

fn sort_items(items: &mut [ScoredPullRequest]) {
    items.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| b.unresolved_comments.cmp(&a.unresolved_comments))
            .then_with(|| b.failing_runs.cmp(&a.failing_runs))
            .then_with(|| a.summary.repo.slug().cmp(&b.summary.repo.slug()))
            .then_with(|| a.summary.number.cmp(&b.summary.number))
    });
}

fn sort_pull_request_refs(refs: &mut [PullRequestRef]) {
    refs.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.repo.slug().cmp(&b.repo.slug()))
            .then_with(|| a.number.cmp(&b.number))
    });
}

fn sort_clusters(clusters: &mut [PatternCluster]) {
    clusters.sort_by(|a, b| {
        b.size.cmp(&a.size).then_with(|| {
            let a_key = format!("{}:{}", a.pattern_type.as_str(), a.key);
            let b_key = format!("{}:{}", b.pattern_type.as_str(), b.key);
            a_key.cmp(&b_key)
        })
    });
}
