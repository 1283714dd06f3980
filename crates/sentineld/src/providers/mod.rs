//! Concrete [`sentinel_core::provider::Provider`] adapters. Kept out of
//! `sentinel-core`/`sentinel-engine` so the triage engine never takes a
//! network dependency directly.

pub mod github;

pub use github::GitHubProvider;
