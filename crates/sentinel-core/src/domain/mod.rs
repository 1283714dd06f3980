//! Domain models for sentinel-eye.
//!
//! Canonical definitions for the core entities moving through the
//! triage pipeline:
//! - [`RepositoryRef`]: identity for every lookup
//! - [`Notification`] / [`PullRequestSummary`] / [`UnresolvedComment`] /
//!   [`FailureRun`]: raw provider data
//! - [`ScoredPullRequest`] / [`PatternCluster`]: triage engine output
//! - [`DashboardSection`] / [`Snapshot`] / [`Status`]: published wire shapes

pub mod dashboard;
pub mod error;
pub mod notification;
pub mod pattern;
pub mod pull_request;
pub mod repo;
pub mod scored;
pub mod snapshot;

pub use dashboard::{DashboardSection, ErrorPayload};
pub use error::{extract_code, truncate_message, Result, SentinelError};
pub use notification::Notification;
pub use pattern::{PatternCluster, PatternType, PullRequestRef};
pub use pull_request::{FailureRun, Job, PullRequestSummary, UnresolvedComment};
pub use repo::RepositoryRef;
pub use scored::{ScoreBreakdown, ScoredPullRequest};
pub use snapshot::{
    DigestReport, InboxReport, PatternsReport, ScoreReport, Snapshot, SnapshotMeta,
    SnapshotSections, Status,
};
