//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mirror_relay::config::RelayConfig;
use mirror_relay::correlate::key::strategy_from_config;
use mirror_relay::correlate::{Correlator, PendingTable};
use mirror_relay::filter::DomainFilter;
use mirror_relay::ingest::{session, IngestListener};
use mirror_relay::transport::run_feed_pump;
use mirror_relay::transport::ws::WebSocketSink;
use mirror_relay::Shutdown;

/// Start a mock downstream consumer accepting WebSocket connections.
///
/// Returns a receiver yielding every text frame the consumer sees.
pub async fn start_mock_consumer(addr: SocketAddr) -> mpsc::UnboundedReceiver<String> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                            return;
                        };
                        while let Some(Ok(msg)) = ws.next().await {
                            if msg.is_text() {
                                if let Ok(text) = msg.into_text() {
                                    let _ = tx.send(text.to_string());
                                }
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    rx
}

/// Assemble and spawn a full relay pipeline from a config.
///
/// Returns the actual ingest address (the config may bind port 0) and the
/// shutdown coordinator.
#[allow(dead_code)]
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();

    let filter = Arc::new(ArcSwap::from_pointee(DomainFilter::new(
        &config.filter.blocked_domains,
    )));

    let (feed_tx, feed_rx) = mpsc::channel(config.downstream.send_queue_size);
    let sink = WebSocketSink::connect(&config.downstream).await;
    tokio::spawn(run_feed_pump(sink, feed_rx, shutdown.subscribe()));

    let correlator = Arc::new(Correlator::new(
        PendingTable::new(),
        strategy_from_config(config.correlation.strategy),
        filter,
        feed_tx,
    ));

    let listener = IngestListener::bind(&config.ingest).await.unwrap();
    let ingest_addr = listener.local_addr().unwrap();
    tokio::spawn(session::run(listener, correlator, shutdown.subscribe()));

    (ingest_addr, shutdown)
}
