//! Courier agent entry point.
//!
//! Usage: `courier-agent <request.json>...`

mod app;
mod config;
mod surface;
mod tasks;

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting Courier agent");

    let requests: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if requests.is_empty() {
        tracing::warn!("no request files given; usage: courier-agent <request.json>...");
        return Ok(());
    }

    let config = config::Config::load()?;
    tracing::info!(outbox = %config.outbox_dir.display(), "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(app::run(config, requests))?;

    tracing::info!(
        completed = summary.completed,
        failed = summary.failed,
        rejected = summary.rejected,
        "agent finished"
    );
    if summary.failed > 0 || summary.rejected > 0 {
        anyhow::bail!("{} upload(s) failed, {} rejected", summary.failed, summary.rejected);
    }
    Ok(())
}
