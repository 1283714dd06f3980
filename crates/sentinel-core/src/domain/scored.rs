//! Triage engine output: a scored pull request.

use serde::{Deserialize, Serialize};

use super::notification::Notification;
use super::pull_request::PullRequestSummary;

/// The five weighted contributions that sum to [`ScoredPullRequest::risk_points`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub failing_runs: f64,
    pub unresolved_comments: f64,
    pub changed_files: f64,
    pub lines_changed: f64,
    pub duplicate_peers: f64,
}

impl ScoreBreakdown {
    pub fn sum(&self) -> f64 {
        self.failing_runs
            + self.unresolved_comments
            + self.changed_files
            + self.lines_changed
            + self.duplicate_peers
    }
}

/// A pull request enriched with features and a computed priority score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPullRequest {
    #[serde(flatten)]
    pub summary: PullRequestSummary,

    /// Unique, sorted path prefixes touched by this PR.
    pub path_areas: Vec<String>,
    /// Normalized title fingerprint; empty string if no tokens survive.
    pub title_fingerprint: String,
    /// Unique, sorted `"{workflowLabel}::{stepLabel}"` signatures.
    pub failure_signatures: Vec<String>,

    pub unresolved_comments: u32,
    pub failing_runs: u32,
    pub duplicate_peers: u32,

    pub breakdown: ScoreBreakdown,
    /// Sum of `breakdown`'s contributions, rounded to 3 decimals.
    pub risk_points: f64,
    /// `clamp(round(risk_points), 0, 100)`.
    pub priority_score: u32,
    /// `100 - priority_score`.
    pub trust_score: u32,

    pub notification: Option<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_sum() {
        let b = ScoreBreakdown {
            failing_runs: 21.0,
            unresolved_comments: 5.5,
            changed_files: 0.0,
            lines_changed: 0.0,
            duplicate_peers: 0.0,
        };
        assert_eq!(b.sum(), 26.5);
    }
}
