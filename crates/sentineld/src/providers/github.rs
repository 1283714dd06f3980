//! GitHub REST API adapter, grounded in the `AtticClient` pattern
//! (`nix-env-manager/src/attic.rs`): a thin `reqwest::Client` wrapped
//! in a provider-specific struct, one method per capability, errors
//! folded into the domain's `SentinelError` rather than leaking
//! `reqwest::Error` past this module.
//!
//! GitHub's REST API has no per-thread "resolved" flag for review
//! comments (that's GraphQL-only, via `reviewThreads.isResolved`); to
//! keep this adapter on REST, every comment returned by
//! `list_unresolved_comments` is reported as `resolved: false`. This
//! is a known simplification, not a bug: GitHub closes/hides resolved
//! threads from the plain comments list far less aggressively than
//! e.g. GitLab does, so callers see more comments than strictly
//! "unresolved", never fewer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use sentinel_core::domain::{
    FailureRun, Job, Notification, PullRequestSummary, RepositoryRef, UnresolvedComment,
};
use sentinel_core::provider::{
    JobLogsParams, ListFailureRunsParams, ListNotificationsParams, Provider, PullRequestFile,
};
use sentinel_core::{Result, SentinelError};

const API_BASE: &str = "https://api.github.com";

pub struct GitHubProvider {
    http: reqwest::Client,
}

impl GitHubProvider {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("sentinel-eye/0.2")
            .build()
            .expect("failed to build GitHub HTTP client");
        Self { http }
    }

    fn auth_header(auth_token: &str) -> String {
        format!("Bearer {auth_token}")
    }

    async fn get(&self, url: &str, auth_token: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .header("Authorization", Self::auth_header(auth_token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| Self::request_error(url, &e))?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(Self::status_error(url, response).await)
    }

    fn request_error(url: &str, err: &reqwest::Error) -> SentinelError {
        if err.is_timeout() {
            return SentinelError::ApiError(format!("request to {url} timed out"));
        }
        SentinelError::ApiError(format!("request to {url} failed: {err}"))
    }

    async fn status_error(url: &str, response: reqwest::Response) -> SentinelError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        SentinelError::ApiError(format!(
            "GET {url} returned status={} body={snippet}",
            status.as_u16()
        ))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        auth_token: &str,
    ) -> Result<T> {
        let response = self.get(url, auth_token).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SentinelError::ApiError(format!("malformed response from {url}: {e}")))
    }
}

impl Default for GitHubProvider {
    fn default() -> Self {
        Self::new()
    }
}

// -- wire shapes --------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawNotification {
    id: String,
    unread: bool,
    reason: String,
    updated_at: DateTime<Utc>,
    subject: RawNotificationSubject,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawNotificationSubject {
    #[serde(rename = "type")]
    subject_type: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: String,
    owner: RawOwner,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    title: String,
    html_url: String,
    state: String,
    draft: bool,
    user: RawUser,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    changed_files: u32,
    #[serde(default)]
    additions: u32,
    #[serde(default)]
    deletions: u32,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawReviewComment {
    path: String,
    line: Option<i64>,
    user: RawUser,
    body: String,
    created_at: DateTime<Utc>,
    html_url: String,
    #[serde(default)]
    position: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct RawRunsPage {
    workflow_runs: Vec<RawRun>,
}

#[derive(Debug, Deserialize)]
struct RawRun {
    id: u64,
    name: Option<String>,
    path: Option<String>,
    run_number: u64,
    run_attempt: u64,
    html_url: String,
    #[serde(default)]
    pull_requests: Vec<RawRunPullRequest>,
}

#[derive(Debug, Deserialize)]
struct RawRunPullRequest {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct RawJobsPage {
    jobs: Vec<RawJob>,
}

#[derive(Debug, Deserialize)]
struct RawJob {
    id: u64,
    name: String,
    html_url: String,
    conclusion: Option<String>,
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    name: String,
    conclusion: Option<String>,
}

fn pull_number_from_subject_url(url: Option<&str>) -> Option<u64> {
    let url = url?;
    url.rsplit('/').next()?.parse::<u64>().ok()
}

fn map_pull_request(repo: &RepositoryRef, raw: RawPullRequest) -> PullRequestSummary {
    PullRequestSummary {
        repo: repo.clone(),
        number: raw.number,
        title: raw.title,
        html_url: raw.html_url,
        state: raw.state,
        draft: raw.draft,
        author: raw.user.login,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        changed_files: raw.changed_files,
        additions: raw.additions,
        deletions: raw.deletions,
    }
}

#[async_trait]
impl Provider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn list_notifications(
        &self,
        params: ListNotificationsParams,
        auth_token: &str,
    ) -> Result<Vec<Notification>> {
        let url = format!(
            "{API_BASE}/notifications?all={}&per_page={}",
            params.include_read,
            params.max_items.min(100)
        );
        let raw: Vec<RawNotification> = self.get_json(&url, auth_token).await.map_err(|e| {
            if let SentinelError::ApiError(msg) = &e {
                if msg.contains("status=403") || msg.contains("status=401") {
                    return SentinelError::NotificationsScopeRequired(format!(
                        "notifications scope unavailable: {msg}"
                    ));
                }
            }
            e
        })?;

        Ok(raw
            .into_iter()
            .filter(|n| n.repository.owner.login == params.repo.owner && n.repository.name == params.repo.repo)
            .map(|n| Notification {
                id: n.id,
                subject_type: n.subject.subject_type,
                pull_number: pull_number_from_subject_url(n.subject.url.as_deref()),
                reason: n.reason,
                unread: n.unread,
                updated_at: n.updated_at,
                repo: params.repo.clone(),
            })
            .collect())
    }

    async fn list_open_pull_requests(
        &self,
        repo: &RepositoryRef,
        max_pull_requests: u32,
        auth_token: &str,
    ) -> Result<Vec<PullRequestSummary>> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/pulls?state=open&per_page={}",
            repo.owner,
            repo.repo,
            max_pull_requests.min(100)
        );
        let raw: Vec<RawPullRequest> = self.get_json(&url, auth_token).await?;
        Ok(raw.into_iter().map(|r| map_pull_request(repo, r)).collect())
    }

    async fn get_pull_request_summary(
        &self,
        repo: &RepositoryRef,
        number: u64,
        auth_token: &str,
    ) -> Result<PullRequestSummary> {
        let url = format!("{API_BASE}/repos/{}/{}/pulls/{number}", repo.owner, repo.repo);
        let raw: RawPullRequest = self.get_json(&url, auth_token).await?;
        Ok(map_pull_request(repo, raw))
    }

    async fn list_unresolved_comments(
        &self,
        repo: &RepositoryRef,
        number: u64,
        auth_token: &str,
    ) -> Result<Vec<UnresolvedComment>> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/pulls/{number}/comments?per_page=100",
            repo.owner, repo.repo
        );
        let raw: Vec<RawReviewComment> = self.get_json(&url, auth_token).await?;
        Ok(raw
            .into_iter()
            .map(|c| UnresolvedComment {
                file: c.path,
                line: UnresolvedComment::coerce_line(c.line),
                author: c.user.login,
                body: c.body,
                created_at: c.created_at,
                url: c.html_url,
                resolved: false,
                outdated: c.position.is_none(),
            })
            .collect())
    }

    async fn list_failure_runs(
        &self,
        params: ListFailureRunsParams,
        auth_token: &str,
    ) -> Result<Vec<FailureRun>> {
        if let Some(run_id) = &params.run_id {
            let run_url = format!(
                "{API_BASE}/repos/{}/{}/actions/runs/{run_id}",
                params.repo.owner, params.repo.repo
            );
            let raw: RawRun = self.get_json(&run_url, auth_token).await?;
            let run = self.hydrate_run(&params.repo, raw, auth_token).await?;
            return Ok(vec![run]);
        }

        let url = format!(
            "{API_BASE}/repos/{}/{}/actions/runs?status=failure&event=pull_request&per_page={}",
            params.repo.owner,
            params.repo.repo,
            params.max_runs.min(100)
        );
        let page: RawRunsPage = self.get_json(&url, auth_token).await?;
        let mut runs = Vec::new();
        for raw in page.workflow_runs {
            if let Some(pr_number) = params.pr_number {
                if !raw.pull_requests.iter().any(|p| p.number == pr_number) {
                    continue;
                }
            }
            if runs.len() as u32 >= params.max_runs {
                break;
            }
            runs.push(self.hydrate_run(&params.repo, raw, auth_token).await?);
        }
        Ok(runs)
    }

    async fn list_pull_request_files(
        &self,
        repo: &RepositoryRef,
        number: u64,
        max_files: u32,
        auth_token: &str,
    ) -> Result<Vec<PullRequestFile>> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/pulls/{number}/files?per_page={}",
            repo.owner,
            repo.repo,
            max_files.min(100)
        );
        let raw: Vec<RawFile> = self.get_json(&url, auth_token).await?;
        Ok(raw
            .into_iter()
            .take(max_files as usize)
            .map(|f| PullRequestFile { path: f.filename })
            .collect())
    }

    async fn get_job_logs(&self, params: JobLogsParams) -> Result<String> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/actions/jobs/{}/logs",
            params.repo.owner, params.repo.repo, params.job_id
        );
        let response = self.get(&url, &params.auth_token).await?;
        let body = response
            .text()
            .await
            .map_err(|e| SentinelError::ApiError(format!("reading job logs from {url}: {e}")))?;
        Ok(body.chars().take(params.max_log_bytes as usize).collect())
    }

    async fn resolve_open_pull_request_for_branch(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        auth_token: &str,
    ) -> Result<Option<u64>> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/pulls?state=open&head={}:{branch}",
            repo.owner, repo.repo, repo.owner
        );
        let raw: Vec<RawPullRequest> = self.get_json(&url, auth_token).await?;
        Ok(raw.first().map(|r| r.number))
    }
}

impl GitHubProvider {
    async fn hydrate_run(
        &self,
        repo: &RepositoryRef,
        raw: RawRun,
        auth_token: &str,
    ) -> Result<FailureRun> {
        let jobs_url = format!(
            "{API_BASE}/repos/{}/{}/actions/runs/{}/jobs",
            repo.owner, repo.repo, raw.id
        );
        let page: RawJobsPage = self.get_json(&jobs_url, auth_token).await?;
        let jobs = page
            .jobs
            .into_iter()
            .filter(|j| j.conclusion.as_deref() == Some("failure"))
            .map(|j| {
                let failed_step_name = j
                    .steps
                    .into_iter()
                    .find(|s| s.conclusion.as_deref() == Some("failure"))
                    .map(|s| s.name);
                Job {
                    job_id: j.id.to_string(),
                    name: j.name,
                    html_url: j.html_url,
                    failed_step_name,
                }
            })
            .collect();

        Ok(FailureRun {
            run_id: raw.id.to_string(),
            workflow_name: raw.name.unwrap_or_default(),
            workflow_path: raw.path,
            run_number: raw.run_number,
            run_attempt: raw.run_attempt,
            html_url: raw.html_url,
            jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_number_from_subject_url() {
        assert_eq!(
            pull_number_from_subject_url(Some("https://api.github.com/repos/a/r/pulls/42")),
            Some(42)
        );
        assert_eq!(pull_number_from_subject_url(None), None);
        assert_eq!(pull_number_from_subject_url(Some("not-a-number")), None);
    }

    #[test]
    fn test_map_pull_request_carries_identity() {
        let repo = RepositoryRef::new("a", "r").unwrap();
        let raw = RawPullRequest {
            number: 7,
            title: "fix".to_string(),
            html_url: "https://example.com/7".to_string(),
            state: "open".to_string(),
            draft: false,
            user: RawUser { login: "alice".to_string() },
            created_at: Utc::now(),
            updated_at: Utc::now(),
            changed_files: 2,
            additions: 10,
            deletions: 1,
        };
        let pr = map_pull_request(&repo, raw);
        assert_eq!(pr.repo, repo);
        assert_eq!(pr.number, 7);
        assert_eq!(pr.author, "alice");
    }
}
