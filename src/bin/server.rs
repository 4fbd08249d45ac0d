//! CLI entry point (§4.M): `server <config-file-path>`.
//!
//! Grounded in the pack's `downloader` CLI `main.rs`: `clap::Parser` for
//! argument parsing, a `tracing-subscriber` `EnvFilter` registry installed
//! before any other work so `RUST_LOG` is honored from the first log line,
//! and `#[tokio::main] async fn main() -> anyhow::Result<()>` so a startup
//! failure's `Display` is printed and the process exits non-zero without a
//! manual `std::process::exit` call.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use concurrent_http_server::{config::ServerConfig, logger::Logger, server::supervisor::Supervisor};

/// Concurrent static-content HTTP/1.x origin server.
#[derive(Parser, Debug)]
#[command(name = "server", about = "Concurrent static-content HTTP/1.x origin server")]
struct Cli {
    /// Path to the `KEY=VALUE` configuration file.
    config_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let config = ServerConfig::load(&cli.config_path)
        .with_context(|| format!("loading configuration from {}", cli.config_path.display()))?;
    let logger = Logger::open(&config.log_path)
        .with_context(|| format!("opening access log at {}", config.log_path.display()))?;

    tracing::info!(path = %cli.config_path.display(), "configuration loaded");

    Supervisor::new(config, logger)
        .run(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves once SIGINT (`ctrl_c`, all platforms) or, on unix, SIGTERM
/// fires — whichever comes first (§4.I's `tokio::select!`-raced shutdown).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler, SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
