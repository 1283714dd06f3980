//! Thin command-line client for the sentinel-eye refresh daemon.
//!
//! Talks to a running `sentineld` over its HTTP API and prints the
//! raw JSON body; formatting/filtering is left to the caller (`jq`
//! and friends).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "sentinel-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the sentinel-eye refresh daemon", long_about = None)]
struct Cli {
    /// Base URL of the running daemon.
    #[arg(long, env = "SENTINEL_DAEMON_URL", default_value = "http://127.0.0.1:8787")]
    daemon_url: String,

    /// Emit structured JSON logs instead of plain text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the daemon's current dashboard status.
    Status,
    /// Print the daemon's current dashboard snapshot.
    Snapshot,
    /// Trigger a refresh and print the resulting status/snapshot.
    Refresh,
    /// Print the daemon's liveness response.
    Healthz,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    sentinel_core::init_tracing(cli.json_logs, Level::INFO);

    let client = reqwest::Client::new();
    let (method, path) = match cli.command {
        Command::Status => (reqwest::Method::GET, "/api/v1/dashboard/status"),
        Command::Snapshot => (reqwest::Method::GET, "/api/v1/dashboard/snapshot"),
        Command::Refresh => (reqwest::Method::POST, "/api/v1/dashboard/refresh"),
        Command::Healthz => (reqwest::Method::GET, "/healthz"),
    };

    let url = format!("{}{}", cli.daemon_url.trim_end_matches('/'), path);
    let response = client
        .request(method, &url)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?;

    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .context("parsing daemon response as JSON")?;

    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        anyhow::bail!("daemon returned {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_daemon_url() {
        let cli = Cli::parse_from(["sentinel-cli", "status"]);
        assert_eq!(cli.daemon_url, "http://127.0.0.1:8787");
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn test_parses_subcommands() {
        assert!(matches!(
            Cli::parse_from(["sentinel-cli", "snapshot"]).command,
            Command::Snapshot
        ));
        assert!(matches!(
            Cli::parse_from(["sentinel-cli", "refresh"]).command,
            Command::Refresh
        ));
        assert!(matches!(
            Cli::parse_from(["sentinel-cli", "healthz"]).command,
            Command::Healthz
        ));
    }

    #[test]
    fn test_daemon_url_override() {
        let cli = Cli::parse_from([
            "sentinel-cli",
            "--daemon-url",
            "http://example.com:9000",
            "status",
        ]);
        assert_eq!(cli.daemon_url, "http://example.com:9000");
    }
}
