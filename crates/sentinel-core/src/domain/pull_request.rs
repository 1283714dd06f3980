//! Pull request summaries, unresolved review comments, and CI failure runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repo::RepositoryRef;

/// A pull request as reported by the provider. Identity is
/// `(repo, number)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestSummary {
    pub repo: RepositoryRef,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: String,
    pub draft: bool,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub changed_files: u32,
    pub additions: u32,
    pub deletions: u32,
}

impl PullRequestSummary {
    /// `additions + deletions`. Never stored separately; always derived.
    pub fn lines_changed(&self) -> u64 {
        self.additions as u64 + self.deletions as u64
    }
}

/// An unresolved review comment. Only `resolved = false` comments are
/// surfaced by the enrichment step. `line` is coerced to `1` when the
/// provider reports it as absent or `<= 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedComment {
    pub file: String,
    pub line: i64,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub resolved: bool,
    pub outdated: bool,
}

impl UnresolvedComment {
    /// Coerce a provider-reported line number to the `>= 1` invariant.
    pub fn coerce_line(line: Option<i64>) -> i64 {
        match line {
            Some(n) if n > 0 => n,
            _ => 1,
        }
    }
}

/// A single job within a [`FailureRun`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub name: String,
    pub html_url: String,
    pub failed_step_name: Option<String>,
}

/// A CI workflow run that failed, with its constituent jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureRun {
    pub run_id: String,
    pub workflow_name: String,
    pub workflow_path: Option<String>,
    pub run_number: u64,
    pub run_attempt: u64,
    pub html_url: String,
    pub jobs: Vec<Job>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr() -> PullRequestSummary {
        PullRequestSummary {
            repo: RepositoryRef::new("a", "r").unwrap(),
            number: 1,
            title: "fix bug".to_string(),
            html_url: "https://example.com/pr/1".to_string(),
            state: "open".to_string(),
            draft: false,
            author: "alice".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            changed_files: 3,
            additions: 10,
            deletions: 4,
        }
    }

    #[test]
    fn test_lines_changed_is_additions_plus_deletions() {
        assert_eq!(pr().lines_changed(), 14);
    }

    #[test]
    fn test_coerce_line_defaults_to_one() {
        assert_eq!(UnresolvedComment::coerce_line(None), 1);
        assert_eq!(UnresolvedComment::coerce_line(Some(0)), 1);
        assert_eq!(UnresolvedComment::coerce_line(Some(-5)), 1);
    }

    #[test]
    fn test_coerce_line_preserves_positive() {
        assert_eq!(UnresolvedComment::coerce_line(Some(42)), 42);
    }
}
