//! sentinel-core
//!
//! Domain model, configuration loader, provider interface, clock
//! abstraction, and observability plumbing shared by the sentinel-eye
//! daemon, engine, and CLI.

pub mod clock;
pub mod config;
pub mod domain;
pub mod obs;
pub mod provider;
pub mod telemetry;

pub use clock::{Clock, SystemClock};
pub use config::{
    default_config_path, load_config, write_config, Config, ConfigSource, InboxConfig,
    LimitsConfig, PatternsConfig, RefreshConfig, ScoringCaps, ScoringConfig, ScoringWeights,
    ServerConfig,
};
pub use domain::{
    extract_code, truncate_message, DashboardSection, DigestReport, ErrorPayload, FailureRun,
    InboxReport, Job, Notification, PatternCluster, PatternType, PatternsReport,
    PullRequestRef, PullRequestSummary, RepositoryRef, Result, ScoreBreakdown, ScoreReport,
    ScoredPullRequest, SentinelError, Snapshot, SnapshotMeta, SnapshotSections, Status,
    UnresolvedComment,
};
pub use obs::{
    emit_backoff_entered, emit_refresh_coalesced, emit_refresh_finished, emit_refresh_started,
    emit_section_error, RefreshSpan,
};
pub use provider::{
    resolve_auth_token, JobLogsParams, ListFailureRunsParams, ListNotificationsParams, Provider,
    ProviderKind, PullRequestFile,
};
pub use telemetry::init_tracing;

/// sentinel-eye version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
