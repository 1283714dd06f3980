//! The published dashboard snapshot and its derived status view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dashboard::{DashboardSection, ErrorPayload};
use super::pattern::PatternCluster;
use super::repo::RepositoryRef;
use super::scored::ScoredPullRequest;

/// A pull request reference plus notification context, as surfaced by
/// the inbox/digest reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub config_path: String,
    pub generated_at: DateTime<Utc>,
    pub repo: RepositoryRef,
    pub items: Vec<ScoredPullRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboxReport {
    pub config_path: String,
    pub generated_at: DateTime<Utc>,
    pub repo: RepositoryRef,
    pub items: Vec<ScoredPullRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatternsReport {
    pub config_path: String,
    pub generated_at: DateTime<Utc>,
    pub repo: RepositoryRef,
    pub clusters: Vec<PatternCluster>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DigestReport {
    pub config_path: String,
    pub generated_at: DateTime<Utc>,
    pub repo: RepositoryRef,
    pub top_priorities: Vec<ScoredPullRequest>,
}

/// Snapshot-level metadata, shared verbatim across all four sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub repo: RepositoryRef,
    pub provider: String,
    pub generated_at: DateTime<Utc>,
    pub stale: bool,
    pub backoff_seconds: u64,
    pub next_refresh_at: DateTime<Utc>,
    pub refresh_interval_seconds: u64,
}

/// The four dashboard sections, published atomically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSections {
    pub digest: DashboardSection<DigestReport>,
    pub inbox: DashboardSection<InboxReport>,
    pub score: DashboardSection<ScoreReport>,
    pub patterns: DashboardSection<PatternsReport>,
}

impl SnapshotSections {
    /// The first section error, scanned digest -> inbox -> score ->
    /// patterns, per the "primary error" precedence rule.
    pub fn primary_error(&self) -> Option<&ErrorPayload> {
        self.digest
            .error()
            .or_else(|| self.inbox.error())
            .or_else(|| self.score.error())
            .or_else(|| self.patterns.error())
    }

    pub fn all_ok(&self) -> bool {
        self.digest.is_ok() && self.inbox.is_ok() && self.score.is_ok() && self.patterns.is_ok()
    }
}

/// `(meta, sections)`: the full snapshot served from `/api/v1/dashboard/snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub sections: SnapshotSections,
}

/// The scheduler's derived status view, served from
/// `/api/v1/dashboard/status` and folded into `/healthz`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub provider: String,
    pub repo: RepositoryRef,
    pub ready: bool,
    pub stale: bool,
    pub generated_at: DateTime<Utc>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<ErrorPayload>,
    pub backoff_seconds: u64,
    pub next_refresh_at: DateTime<Utc>,
    pub refresh_interval_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("a", "r").unwrap()
    }

    fn ok_sections() -> SnapshotSections {
        let now = Utc::now();
        SnapshotSections {
            digest: DashboardSection::ok(DigestReport {
                config_path: "cfg".to_string(),
                generated_at: now,
                repo: repo(),
                top_priorities: vec![],
            }),
            inbox: DashboardSection::ok(InboxReport {
                config_path: "cfg".to_string(),
                generated_at: now,
                repo: repo(),
                items: vec![],
            }),
            score: DashboardSection::ok(ScoreReport {
                config_path: "cfg".to_string(),
                generated_at: now,
                repo: repo(),
                items: vec![],
            }),
            patterns: DashboardSection::ok(PatternsReport {
                config_path: "cfg".to_string(),
                generated_at: now,
                repo: repo(),
                clusters: vec![],
            }),
        }
    }

    #[test]
    fn test_all_ok_when_every_section_ok() {
        assert!(ok_sections().all_ok());
        assert!(ok_sections().primary_error().is_none());
    }

    #[test]
    fn test_primary_error_scans_digest_first() {
        let mut sections = ok_sections();
        sections.inbox = DashboardSection::err(ErrorPayload::from_display(
            "E_SENTINEL_API_ERROR: inbox broke",
        ));
        sections.score = DashboardSection::err(ErrorPayload::from_display(
            "E_SENTINEL_API_ERROR: score broke",
        ));
        assert!(!sections.all_ok());
        assert_eq!(sections.primary_error().unwrap().message, "inbox broke");
    }
}
