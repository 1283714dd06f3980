//! Dashboard snapshot builder: wraps the triage engine with the
//! two independent open-PRs / notifications sub-pipelines and
//! converts every failure into a section-scoped error rather than
//! propagating it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use sentinel_core::clock::Clock;
use sentinel_core::config::Config;
use sentinel_core::domain::{
    DashboardSection, DigestReport, ErrorPayload, InboxReport, Notification, PatternsReport,
    RepositoryRef, ScoreReport, SentinelError, SnapshotSections,
};
use sentinel_core::provider::{ListNotificationsParams, Provider};

use crate::engine::{run_triage, WorkItem};

/// Everything the builder needs beyond `(provider, repo, limit,
/// config)`: the resolved config path (echoed into every report) and
/// the auth token already resolved by the caller, since token
/// resolution is part of base-context setup the builder does not own.
pub struct SnapshotContext<'a> {
    pub provider: &'a dyn Provider,
    pub repo: RepositoryRef,
    pub limit: u32,
    pub config: &'a Config,
    pub config_path: String,
    pub auth_token: String,
    pub clock: &'a dyn Clock,
}

/// The builder's output: a `generatedAt` timestamp and the four
/// dashboard sections. Staleness/backoff bookkeeping belongs to the
/// scheduler, which wraps this into a full `Snapshot` after
/// applying the retry policy.
pub struct BuiltSnapshot {
    pub generated_at: DateTime<Utc>,
    pub sections: SnapshotSections,
}

fn all_error(generated_at: DateTime<Utc>, payload: ErrorPayload) -> BuiltSnapshot {
    BuiltSnapshot {
        generated_at,
        sections: SnapshotSections {
            digest: DashboardSection::err(payload.clone()),
            inbox: DashboardSection::err(payload.clone()),
            score: DashboardSection::err(payload.clone()),
            patterns: DashboardSection::err(payload),
        },
    }
}

/// Dedupe notifications by PR key, keeping the latest `updatedAt`
/// (ties prefer `unread = true`), per §4.4's notifications path.
fn dedupe_notifications(notifications: Vec<Notification>) -> Vec<Notification> {
    let mut by_key: BTreeMap<(String, u64), Notification> = BTreeMap::new();
    for n in notifications {
        let Some(pull_number) = n.pull_number else {
            continue;
        };
        let key = (n.repo.slug(), pull_number);
        match by_key.get(&key) {
            None => {
                by_key.insert(key, n);
            }
            Some(existing) => {
                let replace = if n.updated_at != existing.updated_at {
                    n.updated_at > existing.updated_at
                } else {
                    n.unread && !existing.unread
                };
                if replace {
                    by_key.insert(key, n);
                }
            }
        }
    }
    by_key.into_values().collect()
}

/// Build a snapshot: resolve `generatedAt` once, then execute the
/// open-PRs and notifications sub-pipelines concurrently so a failure
/// in one never affects the other's sections and neither waits on the
/// other's provider calls.
pub async fn build_snapshot(ctx: SnapshotContext<'_>) -> BuiltSnapshot {
    let generated_at = ctx.clock.now();

    let ((score_section, patterns_section), (inbox_section, digest_section)) = tokio::join!(
        build_open_prs_sections(&ctx, generated_at),
        build_notifications_sections(&ctx, generated_at),
    );

    BuiltSnapshot {
        generated_at,
        sections: SnapshotSections {
            digest: digest_section,
            inbox: inbox_section,
            score: score_section,
            patterns: patterns_section,
        },
    }
}

async fn build_open_prs_sections(
    ctx: &SnapshotContext<'_>,
    generated_at: DateTime<Utc>,
) -> (DashboardSection<ScoreReport>, DashboardSection<PatternsReport>) {
    let max_pull_requests = ctx.limit.min(ctx.config.limits.max_pull_requests);
    let open_prs = ctx
        .provider
        .list_open_pull_requests(&ctx.repo, max_pull_requests, &ctx.auth_token)
        .await;

    let summaries = match open_prs {
        Err(e) => return err_pair(ErrorPayload::from_error(&e)),
        Ok(summaries) => summaries,
    };

    let work_items: Vec<WorkItem> = summaries
        .into_iter()
        .map(|summary| WorkItem {
            repo: summary.repo.clone(),
            pr_number: summary.number,
            summary: Some(summary),
            notification: None,
        })
        .collect();

    let result = match run_triage(work_items, ctx.config, ctx.provider, &ctx.auth_token).await {
        Err(e) => return err_pair(ErrorPayload::from_error(&e)),
        Ok(result) => result,
    };

    let mut items = result.items;
    items.truncate(ctx.limit as usize);
    (
        DashboardSection::ok(ScoreReport {
            config_path: ctx.config_path.clone(),
            generated_at,
            repo: ctx.repo.clone(),
            items,
        }),
        DashboardSection::ok(PatternsReport {
            config_path: ctx.config_path.clone(),
            generated_at,
            repo: ctx.repo.clone(),
            clusters: result.clusters,
        }),
    )
}

async fn build_notifications_sections(
    ctx: &SnapshotContext<'_>,
    generated_at: DateTime<Utc>,
) -> (DashboardSection<InboxReport>, DashboardSection<DigestReport>) {
    let max_items = ctx.config.limits.max_notifications.min(
        ctx.limit
            .max((ctx.limit.saturating_mul(3)).min(ctx.config.limits.max_notifications)),
    );

    let notifications = ctx
        .provider
        .list_notifications(
            ListNotificationsParams {
                repo: ctx.repo.clone(),
                max_items,
                include_read: ctx.config.inbox.include_read_by_default,
            },
            &ctx.auth_token,
        )
        .await;

    let deduped = match notifications {
        Err(e) if ctx.config.inbox.require_notifications_scope => {
            return err_pair(ErrorPayload::from_error(&e));
        }
        Err(_) => Vec::new(),
        Ok(notifications) => {
            let actionable: Vec<Notification> = notifications
                .into_iter()
                .filter(Notification::is_actionable)
                .collect();
            dedupe_notifications(actionable)
        }
    };

    match run_notifications_pipeline(ctx, deduped, generated_at).await {
        Ok(sections) => sections,
        Err(e) => err_pair(ErrorPayload::from_error(&e)),
    }
}

fn err_pair<A, B>(payload: ErrorPayload) -> (DashboardSection<A>, DashboardSection<B>) {
    (DashboardSection::err(payload.clone()), DashboardSection::err(payload))
}

async fn run_notifications_pipeline(
    ctx: &SnapshotContext<'_>,
    notifications: Vec<Notification>,
    generated_at: DateTime<Utc>,
) -> sentinel_core::domain::Result<(
    DashboardSection<InboxReport>,
    DashboardSection<DigestReport>,
)> {
    let work_items: Vec<WorkItem> = notifications
        .into_iter()
        .map(|n| WorkItem {
            repo: n.repo.clone(),
            pr_number: n.pull_number.expect("actionable notification has pull_number"),
            summary: None,
            notification: Some(n),
        })
        .collect();

    let result = run_triage(work_items, ctx.config, ctx.provider, &ctx.auth_token).await?;

    let mut inbox_items = result.items.clone();
    inbox_items.truncate(ctx.limit as usize);

    let mut digest_items = result.items;
    digest_items.truncate(ctx.config.limits.max_digest_items as usize);

    Ok((
        DashboardSection::ok(InboxReport {
            config_path: ctx.config_path.clone(),
            generated_at,
            repo: ctx.repo.clone(),
            items: inbox_items,
        }),
        DashboardSection::ok(DigestReport {
            config_path: ctx.config_path.clone(),
            generated_at,
            repo: ctx.repo.clone(),
            top_priorities: digest_items,
        }),
    ))
}

/// Build a fully-errored snapshot for base-context failures (config
/// load, repo resolution) that never reach the per-pipeline logic
/// above. `generatedAt` still advances.
pub fn pending_snapshot(clock: &dyn Clock, payload: ErrorPayload) -> BuiltSnapshot {
    all_error(clock.now(), payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sentinel_core::clock::testing::FixedClock;
    use sentinel_core::provider::testing::ScriptedProvider;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("acme", "widgets").unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_empty_inputs_all_sections_ok() {
        let provider = ScriptedProvider::new("github");
        provider.push_open_pull_requests(Ok(vec![]));
        provider.push_notifications(Ok(vec![]));

        let config = Config::default();
        let clock = clock();
        let ctx = SnapshotContext {
            provider: &provider,
            repo: repo(),
            limit: 10,
            config: &config,
            config_path: "cfg.json".to_string(),
            auth_token: "token".to_string(),
            clock: &clock,
        };

        let snapshot = build_snapshot(ctx).await;
        assert!(snapshot.sections.all_ok());
        assert_eq!(snapshot.sections.score.data().unwrap().items.len(), 0);
        assert_eq!(snapshot.sections.patterns.data().unwrap().clusters.len(), 0);
        assert_eq!(snapshot.sections.inbox.data().unwrap().items.len(), 0);
        assert_eq!(snapshot.sections.digest.data().unwrap().top_priorities.len(), 0);
    }

    #[tokio::test]
    async fn test_open_prs_failure_isolated_from_notifications() {
        let provider = ScriptedProvider::new("github");
        provider.push_open_pull_requests(Err(SentinelError::ApiError("boom".to_string())));
        provider.push_notifications(Ok(vec![]));

        let config = Config::default();
        let clock = clock();
        let ctx = SnapshotContext {
            provider: &provider,
            repo: repo(),
            limit: 10,
            config: &config,
            config_path: "cfg.json".to_string(),
            auth_token: "token".to_string(),
            clock: &clock,
        };

        let snapshot = build_snapshot(ctx).await;
        assert!(!snapshot.sections.score.is_ok());
        assert!(!snapshot.sections.patterns.is_ok());
        assert!(snapshot.sections.inbox.is_ok());
        assert!(snapshot.sections.digest.is_ok());
    }

    #[tokio::test]
    async fn test_notifications_scope_required_fails_inbox_and_digest() {
        let provider = ScriptedProvider::new("github");
        provider.push_open_pull_requests(Ok(vec![]));
        provider.push_notifications(Err(SentinelError::NotificationsScopeRequired(
            "missing notifications scope".to_string(),
        )));

        let mut config = Config::default();
        config.inbox.require_notifications_scope = true;
        let clock = clock();
        let ctx = SnapshotContext {
            provider: &provider,
            repo: repo(),
            limit: 10,
            config: &config,
            config_path: "cfg.json".to_string(),
            auth_token: "token".to_string(),
            clock: &clock,
        };

        let snapshot = build_snapshot(ctx).await;
        assert!(snapshot.sections.score.is_ok());
        assert!(!snapshot.sections.inbox.is_ok());
        assert!(!snapshot.sections.digest.is_ok());
    }

    #[tokio::test]
    async fn test_notifications_failure_degrades_to_empty_without_scope_requirement() {
        let provider = ScriptedProvider::new("github");
        provider.push_open_pull_requests(Ok(vec![]));
        provider.push_notifications(Err(SentinelError::ApiError("transient".to_string())));

        let config = Config::default();
        let clock = clock();
        let ctx = SnapshotContext {
            provider: &provider,
            repo: repo(),
            limit: 10,
            config: &config,
            config_path: "cfg.json".to_string(),
            auth_token: "token".to_string(),
            clock: &clock,
        };

        let snapshot = build_snapshot(ctx).await;
        assert!(snapshot.sections.inbox.is_ok());
        assert_eq!(snapshot.sections.inbox.data().unwrap().items.len(), 0);
    }

    #[tokio::test]
    async fn test_shared_generated_at_across_sections() {
        let provider = ScriptedProvider::new("github");
        provider.push_open_pull_requests(Ok(vec![]));
        provider.push_notifications(Ok(vec![]));

        let config = Config::default();
        let clock = clock();
        let ctx = SnapshotContext {
            provider: &provider,
            repo: repo(),
            limit: 10,
            config: &config,
            config_path: "cfg.json".to_string(),
            auth_token: "token".to_string(),
            clock: &clock,
        };

        let snapshot = build_snapshot(ctx).await;
        assert_eq!(snapshot.sections.score.data().unwrap().generated_at, snapshot.generated_at);
        assert_eq!(snapshot.sections.inbox.data().unwrap().generated_at, snapshot.generated_at);
    }
}
