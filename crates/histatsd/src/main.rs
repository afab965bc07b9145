//! histatsd — the histats exporter daemon.
//!
//! Assembles the exporter in one process:
//! - Metric repository
//! - Result channel + collector task
//! - One poller task per endpoint
//! - `/metrics` HTTP server
//!
//! # Usage
//!
//! ```text
//! histatsd --config /etc/histats/histats.toml
//! histatsd --listen 127.0.0.1:9100 --interval 5s
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use histats_core::{result_channel, HistatsConfig};
use histats_metrics::{Collector, MetricRepository};
use histats_poller::{HttpProbe, PollSchedule, PollerSet};

#[derive(Parser)]
#[command(name = "histatsd", about = "Endpoint latency exporter")]
struct Cli {
    /// Path to histats.toml. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address for the /metrics server (overrides `server.listen`).
    #[arg(long)]
    listen: Option<String>,

    /// Polling interval such as "1s" or "500ms" (overrides `polling.interval`).
    #[arg(long)]
    interval: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,histatsd=debug,histats=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    run(config).await
}

fn load_config(cli: &Cli) -> anyhow::Result<HistatsConfig> {
    let mut config = match &cli.config {
        Some(path) => HistatsConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => HistatsConfig::default(),
    };

    if let Some(listen) = &cli.listen {
        config.server.listen = listen.clone();
    }
    if let Some(interval) = &cli.interval {
        config.polling.interval = interval.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(config: HistatsConfig) -> anyhow::Result<()> {
    info!("histats exporter starting");

    let addr = config.listen_addr()?;
    let interval = config.polling.interval()?;
    let timeout = config.polling.probe_timeout()?;
    let endpoints = config.endpoints();

    // ── Initialize subsystems ──────────────────────────────────

    let repo = MetricRepository::new();

    let (sink, results) = result_channel(config.polling.channel_capacity, config.polling.overflow);
    if sink.is_bounded() {
        info!(
            capacity = config.polling.channel_capacity,
            overflow = ?config.polling.overflow,
            "result channel initialized"
        );
    } else {
        warn!("result channel is unbounded; a stalled collector will grow memory without limit");
    }

    let probe = Arc::new(HttpProbe::new(timeout)?);
    info!(?interval, ?timeout, endpoints = endpoints.len(), "probe initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let collector = Collector::new(repo.clone());
    let collector_handle = tokio::spawn(collector.run(results, shutdown_rx));

    let mut pollers = PollerSet::spawn(
        endpoints,
        probe,
        sink,
        PollSchedule {
            interval,
            evict_after_failures: config.polling.evict_after_failures,
        },
    );
    info!(count = pollers.len(), endpoints = ?pollers.active(), "pollers running");

    // ── Start scrape server ────────────────────────────────────

    let router = histats_api::build_router(repo);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "metrics server listening");

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    pollers.stop_all().await;
    let _ = collector_handle.await;

    info!("histats exporter stopped");
    Ok(())
}
