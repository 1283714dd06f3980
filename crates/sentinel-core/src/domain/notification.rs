//! Per-user provider notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repo::RepositoryRef;

/// A per-user event emitted by the hosting platform.
///
/// `subject_type` is normalized case-insensitively by
/// [`Notification::is_pull_request`]; only `pullrequest`/`pull_request`
/// survive filtering. Invariant: notifications with `pull_number =
/// None` are dropped before scoring (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub subject_type: String,
    pub pull_number: Option<u64>,
    pub reason: String,
    pub unread: bool,
    pub updated_at: DateTime<Utc>,
    pub repo: RepositoryRef,
}

impl Notification {
    /// True if `subject_type` normalizes (case-insensitively) to a pull
    /// request subject.
    pub fn is_pull_request(&self) -> bool {
        matches!(
            self.subject_type.to_ascii_lowercase().as_str(),
            "pullrequest" | "pull_request"
        )
    }

    /// True if this notification survives the §3 filtering invariant:
    /// it names a pull request and carries a PR number.
    pub fn is_actionable(&self) -> bool {
        self.is_pull_request() && self.pull_number.is_some()
    }
}
