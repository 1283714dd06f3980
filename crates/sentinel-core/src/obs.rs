//! Structured observability hooks for the scheduler's refresh cycle.
//!
//! This module provides:
//! - Refresh-scoped tracing spans via `RefreshSpan` RAII guard
//! - Emission functions for key lifecycle events: refresh start, finish, backoff, gate evaluation
//!
//! Events are emitted at `info!` level, configurable via `RUST_LOG`.
//! For JSON output, pass `json = true` to [`crate::telemetry::init_tracing`].

use tracing::info;

/// RAII guard that enters a refresh-scoped tracing span for the
/// duration of one scheduler cycle.
///
/// # Example
///
/// ```ignore
/// let _span = RefreshSpan::enter("owner/repo");
/// // Now all tracing calls are automatically associated with repo = "owner/repo"
/// ```
pub struct RefreshSpan {
    _span: tracing::span::EnteredSpan,
}

impl RefreshSpan {
    /// Create and enter a span tagged with the repo slug.
    pub fn enter(repo: &str) -> Self {
        let span = tracing::info_span!("sentinel.refresh", repo = %repo);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a refresh cycle started.
pub fn emit_refresh_started(repo: &str, provider: &str) {
    info!(event = "refresh.started", repo = %repo, provider = %provider);
}

/// Emit event: a refresh cycle finished with duration and outcome.
pub fn emit_refresh_finished(repo: &str, duration_ms: u64, sections_ok: u32, success: bool) {
    info!(
        event = "refresh.finished",
        repo = %repo,
        duration_ms = duration_ms,
        sections_ok = sections_ok,
        success = success,
    );
}

/// Emit event: a refresh cycle was skipped because one was already in
/// flight (single-flight coalescing).
pub fn emit_refresh_coalesced(repo: &str) {
    info!(event = "refresh.coalesced", repo = %repo);
}

/// Emit event: the scheduler entered backoff after a retryable
/// failure.
pub fn emit_backoff_entered(repo: &str, backoff_seconds: u64, error_code: &str) {
    tracing::warn!(
        event = "refresh.backoff",
        repo = %repo,
        backoff_seconds = backoff_seconds,
        error_code = %error_code,
    );
}

/// Emit event: a section failed during triage/snapshot assembly
/// (warning level, non-fatal to the overall refresh).
pub fn emit_section_error(repo: &str, section: &str, error_code: &str) {
    tracing::warn!(
        event = "section.error",
        repo = %repo,
        section = %section,
        error_code = %error_code,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_span_create() {
        let _span = RefreshSpan::enter("owner/repo");
    }
}
