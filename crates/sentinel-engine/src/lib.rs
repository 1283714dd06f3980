//! sentinel-engine
//!
//! The deterministic triage engine (scoring + clustering) and the
//! dashboard snapshot builder that wraps it with the two independent
//! open-PRs / notifications sub-pipelines.

pub mod engine;
pub mod snapshot;

pub use engine::{run_triage, ScoreResult, WorkItem};
pub use snapshot::{build_snapshot, pending_snapshot, BuiltSnapshot, SnapshotContext};
