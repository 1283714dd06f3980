mod http;
mod providers;
mod scheduler;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use providers::GitHubProvider;
use scheduler::Scheduler;
use sentinel_core::{load_config, Clock, Provider, ProviderKind, RepositoryRef, SystemClock};

/// sentinel-eye refresh daemon: publishes a triage dashboard snapshot
/// over HTTP for one repository.
#[derive(Debug, Parser)]
#[command(name = "sentineld", version)]
struct Args {
    /// Repository to triage, as "owner/repo". Falls back to the
    /// config file's defaultRepo if omitted.
    #[arg(long)]
    repo: Option<String>,

    /// Source-control platform to query.
    #[arg(long, default_value = "github")]
    provider: String,

    /// Path to the config file. Defaults to .seven-shadow/sentinel-eye.json.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of items per section.
    #[arg(long, default_value_t = 25)]
    limit: u32,

    /// Override the config file's server.bindAddr.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Emit structured JSON logs instead of plain text.
    #[arg(long)]
    json_logs: bool,

    /// Minimum tracing level.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level: Level = args.log_level.parse().unwrap_or(Level::INFO);
    sentinel_core::init_tracing(args.json_logs, log_level);

    let (config, config_path, source) =
        load_config(args.config.as_deref()).context("loading configuration")?;
    tracing::info!(event = "config_loaded", path = %config_path.display(), source = ?source);

    let repo_slug = args
        .repo
        .clone()
        .or_else(|| config.default_repo.clone())
        .context("no --repo given and config has no defaultRepo")?;
    let repo = RepositoryRef::parse(&repo_slug)
        .map_err(|e| anyhow::anyhow!("invalid --repo {repo_slug:?}: {e}"))?;

    let provider_name = args
        .repo
        .as_ref()
        .map(|_| args.provider.clone())
        .unwrap_or_else(|| config.default_provider.clone().unwrap_or(args.provider.clone()));
    let provider_kind = ProviderKind::parse(&provider_name)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let auth_token = sentinel_core::resolve_auth_token(provider_kind.token_env_var())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let provider: Arc<dyn Provider> = match provider_kind {
        ProviderKind::GitHub => Arc::new(GitHubProvider::new()),
        ProviderKind::GitLab | ProviderKind::Bitbucket => {
            anyhow::bail!(
                "{}",
                sentinel_core::SentinelError::ProviderNotImplemented(format!(
                    "{} has no adapter yet",
                    provider_kind.as_str()
                ))
            )
        }
    };

    let limit = args.limit.max(1);
    let bind_addr = args
        .bind_addr
        .clone()
        .unwrap_or_else(|| config.server.bind_addr.clone());
    let asset_root = PathBuf::from(&config.server.asset_root);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = Arc::new(Scheduler::new(
        provider,
        repo,
        config,
        source,
        config_path.display().to_string(),
        auth_token,
        limit,
        clock,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let loop_handle = tokio::spawn(Arc::clone(&scheduler).run_loop(shutdown_rx));

    let router = http::build_router(Arc::clone(&scheduler), config_path.clone(), asset_root);
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {bind_addr:?}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(event = "server_listening", addr = %addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    let _ = shutdown_tx.send(true);
    let _ = loop_handle.await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!(event = "shutdown_signal_received");
}
