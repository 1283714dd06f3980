//! Refresh scheduler: wraps the snapshot builder in a single-flight
//! periodic loop backed by `Mutex`-guarded shared state rather than a
//! channel-actor design.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use sentinel_core::domain::{DashboardSection, ErrorPayload, Snapshot, SnapshotMeta, Status};
use sentinel_core::{emit_backoff_entered, emit_refresh_coalesced, emit_refresh_finished, emit_refresh_started, Clock, Config, ConfigSource, Provider, RepositoryRef};
use sentinel_engine::{build_snapshot, SnapshotContext};
use tokio::sync::{Mutex, RwLock};
use tracing::Instrument;

const MIN_BACKOFF_FLOOR_SECONDS: u64 = 1;
const MAX_BACKOFF_SECONDS: u64 = 900;

struct State {
    latest_snapshot: Snapshot,
    has_refreshed: bool,
    last_success_at: Option<chrono::DateTime<Utc>>,
    last_error: Option<ErrorPayload>,
    backoff_seconds: u64,
}

/// Shared, long-lived refresh state for one `(repo, provider)` pair.
pub struct Scheduler {
    provider: Arc<dyn Provider>,
    repo: RepositoryRef,
    config: RwLock<Config>,
    config_source: RwLock<ConfigSource>,
    config_path: String,
    auth_token: String,
    limit: u32,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    refresh_gate: Mutex<()>,
}

fn pending_status(generated_at: chrono::DateTime<Utc>, repo: &RepositoryRef, provider: &str) -> Snapshot {
    let payload = ErrorPayload::from_display("E_DASHBOARD_PENDING: refresh has not completed yet");
    Snapshot {
        meta: SnapshotMeta {
            repo: repo.clone(),
            provider: provider.to_string(),
            generated_at,
            stale: false,
            backoff_seconds: 0,
            next_refresh_at: generated_at,
            refresh_interval_seconds: 0,
        },
        sections: sentinel_core::domain::SnapshotSections {
            digest: DashboardSection::err(payload.clone()),
            inbox: DashboardSection::err(payload.clone()),
            score: DashboardSection::err(payload.clone()),
            patterns: DashboardSection::err(payload),
        },
    }
}

impl Scheduler {
    pub fn new(
        provider: Arc<dyn Provider>,
        repo: RepositoryRef,
        config: Config,
        config_source: ConfigSource,
        config_path: String,
        auth_token: String,
        limit: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        let latest_snapshot = pending_status(now, &repo, provider.name());
        Self {
            provider,
            repo,
            config: RwLock::new(config),
            config_source: RwLock::new(config_source),
            config_path,
            auth_token,
            limit,
            clock,
            state: Mutex::new(State {
                latest_snapshot,
                has_refreshed: false,
                last_success_at: None,
                last_error: None,
                backoff_seconds: 0,
            }),
            refresh_gate: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.latest_snapshot.clone()
    }

    pub async fn config_snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn config_source(&self) -> ConfigSource {
        *self.config_source.read().await
    }

    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    /// Swap in a new config, taking effect on the next refresh cycle.
    /// Always reported as file-backed afterward, since the only writer
    /// of a new config is the `PUT` handler, which persists it first.
    pub async fn set_config(&self, config: Config) {
        *self.config.write().await = config;
        *self.config_source.write().await = ConfigSource::File;
    }

    pub async fn status(&self) -> Status {
        let state = self.state.lock().await;
        let meta = &state.latest_snapshot.meta;
        Status {
            provider: meta.provider.clone(),
            repo: meta.repo.clone(),
            ready: state.has_refreshed,
            stale: meta.stale,
            generated_at: meta.generated_at,
            last_success_at: state.last_success_at,
            last_error: state.last_error.clone(),
            backoff_seconds: state.backoff_seconds,
            next_refresh_at: meta.next_refresh_at,
            refresh_interval_seconds: self.config.read().await.refresh.interval_seconds,
        }
    }

    /// Runs the refresh algorithm. Only one refresh
    /// body executes at a time; a caller arriving while one is already
    /// running waits for it to finish and observes its result instead
    /// of starting a second one.
    pub async fn trigger_refresh(&self) -> Snapshot {
        match self.refresh_gate.try_lock() {
            Ok(_permit) => self.run_refresh().await,
            Err(_) => {
                emit_refresh_coalesced(&self.repo.slug());
                let _permit = self.refresh_gate.lock().await;
                self.snapshot().await
            }
        }
    }

    async fn run_refresh(&self) -> Snapshot {
        let span = tracing::info_span!("sentinel.refresh", repo = %self.repo.slug());
        self.run_refresh_inner().instrument(span).await
    }

    async fn run_refresh_inner(&self) -> Snapshot {
        emit_refresh_started(&self.repo.slug(), self.provider.name());
        let started = self.clock.now();

        let config = self.config.read().await.clone();
        let ctx = SnapshotContext {
            provider: self.provider.as_ref(),
            repo: self.repo.clone(),
            limit: self.limit,
            config: &config,
            config_path: self.config_path.clone(),
            auth_token: self.auth_token.clone(),
            clock: self.clock.as_ref(),
        };
        let built = build_snapshot(ctx).await;

        let mut state = self.state.lock().await;
        state.has_refreshed = true;
        let interval = config.refresh.interval_seconds;
        let all_ok = built.sections.all_ok();
        let primary_error = built.sections.primary_error().cloned();

        let snapshot = if all_ok {
            state.last_success_at = Some(built.generated_at);
            state.last_error = None;
            state.backoff_seconds = 0;
            Snapshot {
                meta: SnapshotMeta {
                    repo: self.repo.clone(),
                    provider: self.provider.name().to_string(),
                    generated_at: built.generated_at,
                    stale: false,
                    backoff_seconds: 0,
                    next_refresh_at: built.generated_at + chrono::Duration::seconds(interval as i64),
                    refresh_interval_seconds: interval,
                },
                sections: built.sections,
            }
        } else {
            let retryable = primary_error.as_ref().map(|e| e.is_retryable()).unwrap_or(false);
            let had_prior_success = state.last_success_at.is_some();

            if retryable && had_prior_success {
                let backoff = self.next_backoff(primary_error.as_ref(), state.backoff_seconds, interval);
                state.backoff_seconds = backoff;
                state.last_error = primary_error.clone();
                if let Some(err) = &primary_error {
                    emit_backoff_entered(&self.repo.slug(), backoff, &err.code);
                }
                let mut stale = state.latest_snapshot.clone();
                stale.meta.stale = true;
                stale.meta.backoff_seconds = backoff;
                stale.meta.generated_at = built.generated_at;
                stale.meta.next_refresh_at = built.generated_at + chrono::Duration::seconds(backoff as i64);
                stale
            } else {
                state.last_error = primary_error;
                state.backoff_seconds = 0;
                Snapshot {
                    meta: SnapshotMeta {
                        repo: self.repo.clone(),
                        provider: self.provider.name().to_string(),
                        generated_at: built.generated_at,
                        stale: false,
                        backoff_seconds: 0,
                        next_refresh_at: built.generated_at + chrono::Duration::seconds(interval as i64),
                        refresh_interval_seconds: interval,
                    },
                    sections: built.sections,
                }
            }
        };

        state.latest_snapshot = snapshot.clone();
        let duration_ms = (self.clock.now() - started).num_milliseconds().max(0) as u64;
        let sections_ok = [
            snapshot.sections.digest.is_ok(),
            snapshot.sections.inbox.is_ok(),
            snapshot.sections.score.is_ok(),
            snapshot.sections.patterns.is_ok(),
        ]
        .iter()
        .filter(|ok| **ok)
        .count() as u32;
        emit_refresh_finished(&self.repo.slug(), duration_ms, sections_ok, all_ok);

        snapshot
    }

    fn next_backoff(&self, error: Option<&ErrorPayload>, current: u64, interval: u64) -> u64 {
        if let Some(retry_after) = error.and_then(|e| e.retry_after_seconds()) {
            return retry_after.clamp(interval.max(MIN_BACKOFF_FLOOR_SECONDS), MAX_BACKOFF_SECONDS);
        }
        let doubled = if current > 0 { current * 2 } else { interval * 2 };
        doubled.min(MAX_BACKOFF_SECONDS)
    }

    /// Runs the refresh loop until `shutdown` resolves, sleeping
    /// `refresh_interval_seconds` (or the current backoff) between
    /// wakes.
    pub async fn run_loop(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            let sleep_secs = {
                let state = self.state.lock().await;
                if state.backoff_seconds > 0 {
                    state.backoff_seconds
                } else {
                    self.config.read().await.refresh.interval_seconds
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(StdDuration::from_secs(sleep_secs)) => {
                    self.trigger_refresh().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::clock::testing::FixedClock;
    use sentinel_core::domain::{
        FailureRun, Notification, PullRequestSummary, UnresolvedComment,
    };
    use sentinel_core::provider::testing::ScriptedProvider;
    use sentinel_core::provider::PullRequestFile;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("a", "r").unwrap()
    }

    fn pr(number: u64) -> PullRequestSummary {
        PullRequestSummary {
            repo: repo(),
            number,
            title: "fix thing".to_string(),
            html_url: "https://example.com".to_string(),
            state: "open".to_string(),
            draft: false,
            author: "alice".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            changed_files: 1,
            additions: 1,
            deletions: 1,
        }
    }

    fn scheduler_with(provider: ScriptedProvider, config: Config) -> Scheduler {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        Scheduler::new(
            Arc::new(provider),
            repo(),
            config,
            ConfigSource::File,
            "cfg.json".to_string(),
            "token".to_string(),
            10,
            clock,
        )
    }

    fn empty_ok_provider() -> ScriptedProvider {
        let provider = ScriptedProvider::new("github");
        provider.push_open_pull_requests(Ok(vec![pr(1)]));
        provider.push_unresolved_comments(Ok(Vec::<UnresolvedComment>::new()));
        provider.push_failure_runs(Ok(Vec::<FailureRun>::new()));
        provider.push_pull_request_files(Ok(Vec::<PullRequestFile>::new()));
        provider.push_notifications(Ok(Vec::<Notification>::new()));
        provider
    }

    #[tokio::test]
    async fn test_successful_refresh_clears_backoff_and_marks_success() {
        let scheduler = scheduler_with(empty_ok_provider(), Config::default());
        let snapshot = scheduler.trigger_refresh().await;
        assert!(snapshot.sections.all_ok());
        assert!(!snapshot.meta.stale);
        let status = scheduler.status().await;
        assert!(status.ready);
        assert_eq!(status.backoff_seconds, 0);
    }

    #[tokio::test]
    async fn test_retryable_failure_before_first_success_publishes_as_is() {
        let provider = ScriptedProvider::new("github");
        provider.push_open_pull_requests(Err(sentinel_core::SentinelError::ApiError(
            "status=429 rate limited".to_string(),
        )));
        provider.push_notifications(Ok(Vec::new()));
        let scheduler = scheduler_with(provider, Config::default());
        let snapshot = scheduler.trigger_refresh().await;
        assert!(!snapshot.meta.stale);
        assert_eq!(snapshot.meta.backoff_seconds, 0);
        let status = scheduler.status().await;
        assert!(status.ready);
        assert!(status.last_success_at.is_none());
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_retryable_failure_after_success_goes_stale_with_backoff() {
        let provider = empty_ok_provider();
        provider.push_open_pull_requests(Err(sentinel_core::SentinelError::ApiError(
            "status=429 rate limited".to_string(),
        )));
        provider.push_notifications(Ok(Vec::new()));
        let scheduler = scheduler_with(provider, Config::default());
        let first = scheduler.trigger_refresh().await;
        assert!(first.sections.all_ok());

        let second = scheduler.trigger_refresh().await;
        assert!(second.meta.stale);
        assert!(second.meta.backoff_seconds > 0);
        let status = scheduler.status().await;
        assert!(status.ready);
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_non_retryable_failure_publishes_candidate_without_backoff() {
        let provider = ScriptedProvider::new("github");
        provider.push_open_pull_requests(Err(sentinel_core::SentinelError::ProviderUnsupported(
            "sourcehut".to_string(),
        )));
        provider.push_notifications(Ok(Vec::new()));
        let scheduler = scheduler_with(provider, Config::default());
        let snapshot = scheduler.trigger_refresh().await;
        assert!(!snapshot.meta.stale);
        assert_eq!(snapshot.meta.backoff_seconds, 0);
        let status = scheduler.status().await;
        assert!(status.ready);
        assert!(status.last_success_at.is_none());
    }

    #[tokio::test]
    async fn test_ready_is_false_until_first_refresh_completes() {
        let scheduler = scheduler_with(empty_ok_provider(), Config::default());
        let status = scheduler.status().await;
        assert!(!status.ready);
    }
}
