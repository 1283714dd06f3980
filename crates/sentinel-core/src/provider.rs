//! Provider capability interface: the contract the triage engine
//! consumes. Every call is stateless and non-mutating; the auth token
//! is passed per call and resolved once at context setup.

use async_trait::async_trait;

use crate::domain::error::{Result, SentinelError};
use crate::domain::{FailureRun, Notification, PullRequestSummary, RepositoryRef, UnresolvedComment};

/// A single file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestFile {
    pub path: String,
}

/// Inputs to [`Provider::list_notifications`].
#[derive(Debug, Clone)]
pub struct ListNotificationsParams {
    pub repo: RepositoryRef,
    pub max_items: u32,
    pub include_read: bool,
}

/// Inputs to [`Provider::list_failure_runs`].
#[derive(Debug, Clone)]
pub struct ListFailureRunsParams {
    pub repo: RepositoryRef,
    pub pr_number: Option<u64>,
    pub run_id: Option<String>,
    pub max_runs: u32,
}

/// Inputs to [`Provider::get_job_logs`].
#[derive(Debug, Clone)]
pub struct JobLogsParams {
    pub repo: RepositoryRef,
    pub job_id: String,
    pub auth_token: String,
    pub max_log_bytes: u32,
}

/// The capabilities the triage engine needs from a source-control
/// hosting platform. Implementors cover one of GitHub / GitLab /
/// Bitbucket; `async-trait` keeps the trait object-safe so the
/// scheduler can hold a `Arc<dyn Provider>` chosen at startup.
///
/// Every method must resolve `AuthMissing` before performing any
/// network I/O when the per-provider token is absent.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The provider's name as reported in `SnapshotMeta::provider`
    /// (e.g. `"github"`).
    fn name(&self) -> &'static str;

    async fn list_notifications(
        &self,
        params: ListNotificationsParams,
        auth_token: &str,
    ) -> Result<Vec<Notification>>;

    async fn list_open_pull_requests(
        &self,
        repo: &RepositoryRef,
        max_pull_requests: u32,
        auth_token: &str,
    ) -> Result<Vec<PullRequestSummary>>;

    async fn get_pull_request_summary(
        &self,
        repo: &RepositoryRef,
        number: u64,
        auth_token: &str,
    ) -> Result<PullRequestSummary>;

    async fn list_unresolved_comments(
        &self,
        repo: &RepositoryRef,
        number: u64,
        auth_token: &str,
    ) -> Result<Vec<UnresolvedComment>>;

    async fn list_failure_runs(
        &self,
        params: ListFailureRunsParams,
        auth_token: &str,
    ) -> Result<Vec<FailureRun>>;

    async fn list_pull_request_files(
        &self,
        repo: &RepositoryRef,
        number: u64,
        max_files: u32,
        auth_token: &str,
    ) -> Result<Vec<PullRequestFile>>;

    async fn get_job_logs(&self, params: JobLogsParams) -> Result<String>;

    async fn resolve_open_pull_request_for_branch(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        auth_token: &str,
    ) -> Result<Option<u64>>;
}

/// Resolve the per-provider auth token from the environment, failing
/// with `AuthMissing` before any network I/O.
pub fn resolve_auth_token(env_var: &str) -> Result<String> {
    std::env::var(env_var)
        .ok()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SentinelError::AuthMissing(env_var.to_string()))
}

/// Which upstream platform a [`Provider`] talks to, and the
/// environment variable its token is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GitHub,
    GitLab,
    Bitbucket,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::Bitbucket => "bitbucket",
        }
    }

    pub fn token_env_var(&self) -> &'static str {
        match self {
            Self::GitHub => "SENTINEL_GITHUB_TOKEN",
            Self::GitLab => "SENTINEL_GITLAB_TOKEN",
            Self::Bitbucket => "SENTINEL_BITBUCKET_TOKEN",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            "bitbucket" => Ok(Self::Bitbucket),
            other => Err(SentinelError::ProviderUnsupported(other.to_string())),
        }
    }
}

/// Test doubles for engine and scheduler tests that must not touch
/// the network.
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// A scripted [`Provider`] that replays queued responses in call
    /// order, one queue per method. Panics (via `expect`) if a method
    /// is called more times than it was scripted, surfacing test bugs
    /// immediately rather than masking them with a default.
    pub struct ScriptedProvider {
        name: &'static str,
        notifications: Mutex<VecDeque<Result<Vec<Notification>>>>,
        open_pull_requests: Mutex<VecDeque<Result<Vec<PullRequestSummary>>>>,
        pull_request_summaries: Mutex<VecDeque<Result<PullRequestSummary>>>,
        unresolved_comments: Mutex<VecDeque<Result<Vec<UnresolvedComment>>>>,
        failure_runs: Mutex<VecDeque<Result<Vec<FailureRun>>>>,
        pull_request_files: Mutex<VecDeque<Result<Vec<PullRequestFile>>>>,
        job_logs: Mutex<VecDeque<Result<String>>>,
        resolved_branches: Mutex<VecDeque<Result<Option<u64>>>>,
    }

    impl ScriptedProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                notifications: Mutex::new(VecDeque::new()),
                open_pull_requests: Mutex::new(VecDeque::new()),
                pull_request_summaries: Mutex::new(VecDeque::new()),
                unresolved_comments: Mutex::new(VecDeque::new()),
                failure_runs: Mutex::new(VecDeque::new()),
                pull_request_files: Mutex::new(VecDeque::new()),
                job_logs: Mutex::new(VecDeque::new()),
                resolved_branches: Mutex::new(VecDeque::new()),
            }
        }

        pub fn push_notifications(&self, result: Result<Vec<Notification>>) {
            self.notifications.lock().unwrap().push_back(result);
        }

        pub fn push_open_pull_requests(&self, result: Result<Vec<PullRequestSummary>>) {
            self.open_pull_requests.lock().unwrap().push_back(result);
        }

        pub fn push_pull_request_summary(&self, result: Result<PullRequestSummary>) {
            self.pull_request_summaries.lock().unwrap().push_back(result);
        }

        pub fn push_unresolved_comments(&self, result: Result<Vec<UnresolvedComment>>) {
            self.unresolved_comments.lock().unwrap().push_back(result);
        }

        pub fn push_failure_runs(&self, result: Result<Vec<FailureRun>>) {
            self.failure_runs.lock().unwrap().push_back(result);
        }

        pub fn push_pull_request_files(&self, result: Result<Vec<PullRequestFile>>) {
            self.pull_request_files.lock().unwrap().push_back(result);
        }

        pub fn push_job_logs(&self, result: Result<String>) {
            self.job_logs.lock().unwrap().push_back(result);
        }

        pub fn push_resolved_branch(&self, result: Result<Option<u64>>) {
            self.resolved_branches.lock().unwrap().push_back(result);
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn list_notifications(
            &self,
            _params: ListNotificationsParams,
            _auth_token: &str,
        ) -> Result<Vec<Notification>> {
            self.notifications
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no queued list_notifications response")
        }

        async fn list_open_pull_requests(
            &self,
            _repo: &RepositoryRef,
            _max_pull_requests: u32,
            _auth_token: &str,
        ) -> Result<Vec<PullRequestSummary>> {
            self.open_pull_requests
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no queued list_open_pull_requests response")
        }

        async fn get_pull_request_summary(
            &self,
            _repo: &RepositoryRef,
            _number: u64,
            _auth_token: &str,
        ) -> Result<PullRequestSummary> {
            self.pull_request_summaries
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no queued get_pull_request_summary response")
        }

        async fn list_unresolved_comments(
            &self,
            _repo: &RepositoryRef,
            _number: u64,
            _auth_token: &str,
        ) -> Result<Vec<UnresolvedComment>> {
            self.unresolved_comments
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no queued list_unresolved_comments response")
        }

        async fn list_failure_runs(
            &self,
            _params: ListFailureRunsParams,
            _auth_token: &str,
        ) -> Result<Vec<FailureRun>> {
            self.failure_runs
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no queued list_failure_runs response")
        }

        async fn list_pull_request_files(
            &self,
            _repo: &RepositoryRef,
            _number: u64,
            _max_files: u32,
            _auth_token: &str,
        ) -> Result<Vec<PullRequestFile>> {
            self.pull_request_files
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no queued list_pull_request_files response")
        }

        async fn get_job_logs(&self, _params: JobLogsParams) -> Result<String> {
            self.job_logs
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no queued get_job_logs response")
        }

        async fn resolve_open_pull_request_for_branch(
            &self,
            _repo: &RepositoryRef,
            _branch: &str,
            _auth_token: &str,
        ) -> Result<Option<u64>> {
            self.resolved_branches
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no queued resolve_open_pull_request_for_branch response")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trips() {
        assert_eq!(ProviderKind::parse("github").unwrap().as_str(), "github");
        assert_eq!(ProviderKind::parse("gitlab").unwrap().as_str(), "gitlab");
        assert_eq!(
            ProviderKind::parse("bitbucket").unwrap().as_str(),
            "bitbucket"
        );
    }

    #[test]
    fn test_provider_kind_rejects_unknown() {
        let err = ProviderKind::parse("sourcehut").unwrap_err();
        assert_eq!(err.code(), "E_PROVIDER_UNSUPPORTED");
    }

    #[test]
    fn test_token_env_var_names() {
        assert_eq!(ProviderKind::GitHub.token_env_var(), "SENTINEL_GITHUB_TOKEN");
        assert_eq!(ProviderKind::GitLab.token_env_var(), "SENTINEL_GITLAB_TOKEN");
        assert_eq!(
            ProviderKind::Bitbucket.token_env_var(),
            "SENTINEL_BITBUCKET_TOKEN"
        );
    }

    #[test]
    fn test_resolve_auth_token_missing_fails_before_io() {
        let var = "SENTINEL_TEST_TOKEN_DOES_NOT_EXIST";
        std::env::remove_var(var);
        let err = resolve_auth_token(var).unwrap_err();
        assert_eq!(err.code(), "E_SENTINEL_AUTH_MISSING");
    }

    #[test]
    fn test_resolve_auth_token_present() {
        let var = "SENTINEL_TEST_TOKEN_PRESENT";
        std::env::set_var(var, "abc123");
        assert_eq!(resolve_auth_token(var).unwrap(), "abc123");
        std::env::remove_var(var);
    }
}
