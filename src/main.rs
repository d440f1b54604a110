//! Mirror relay binary.
//!
//! Wires the subsystems together: config, observability, the downstream
//! feed, the correlation engine, and the ingest listener. Runs until
//! SIGINT/SIGTERM, then drains via the shutdown broadcast.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::sync::mpsc;

use mirror_relay::config::loader::load_config;
use mirror_relay::config::watcher::ConfigWatcher;
use mirror_relay::config::RelayConfig;
use mirror_relay::correlate::key::strategy_from_config;
use mirror_relay::correlate::table::StaleSweeper;
use mirror_relay::correlate::{Correlator, PendingTable};
use mirror_relay::filter::DomainFilter;
use mirror_relay::ingest::{session, IngestListener};
use mirror_relay::observability::{logging, metrics};
use mirror_relay::transport::ws::WebSocketSink;
use mirror_relay::transport::run_feed_pump;
use mirror_relay::Shutdown;

#[derive(Parser)]
#[command(name = "mirror-relay")]
#[command(about = "Correlates intercepted request/response pairs into a downstream feed", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the downstream WebSocket endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the ingest bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(endpoint) = cli.endpoint {
        config.downstream.endpoint = endpoint;
    }
    if let Some(bind) = cli.bind {
        config.ingest.bind_address = bind;
    }

    logging::init(&config.observability.log_level);

    tracing::info!("mirror-relay v0.1.0 starting");
    tracing::info!(
        bind_address = %config.ingest.bind_address,
        endpoint = %config.downstream.endpoint,
        strategy = ?config.correlation.strategy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();

    // Hot-swappable domain filter.
    let filter = Arc::new(ArcSwap::from_pointee(DomainFilter::new(
        &config.filter.blocked_domains,
    )));

    // Config watcher applies filter updates; held for the process lifetime.
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let filter = filter.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    filter.store(Arc::new(DomainFilter::new(&new_config.filter.blocked_domains)));
                    tracing::info!(
                        blocked_domains = new_config.filter.blocked_domains.len(),
                        "Domain filter reloaded"
                    );
                }
            });
            Some(watcher.run()?)
        }
        None => None,
    };

    // Downstream feed: sink task draining the bounded record queue.
    let (feed_tx, feed_rx) = mpsc::channel(config.downstream.send_queue_size);
    let sink = WebSocketSink::connect(&config.downstream).await;
    tokio::spawn(run_feed_pump(sink, feed_rx, shutdown.subscribe()));

    // Correlation engine.
    let table = PendingTable::new();
    if let Some(max_age_secs) = config.correlation.max_pending_age_secs {
        let sweeper = StaleSweeper::new(
            table.clone(),
            Duration::from_secs(max_age_secs),
            Duration::from_secs(config.correlation.sweep_interval_secs),
        );
        tokio::spawn(sweeper.run(shutdown.subscribe()));
    }
    let correlator = Arc::new(Correlator::new(
        table,
        strategy_from_config(config.correlation.strategy),
        filter,
        feed_tx,
    ));

    // Ingest surface.
    let listener = IngestListener::bind(&config.ingest).await?;
    tokio::spawn(session::run(listener, correlator, shutdown.subscribe()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();

    // Give tasks a moment to drain before the runtime drops them.
    tokio::time::sleep(Duration::from_millis(100)).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
