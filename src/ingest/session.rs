//! Per-connection event decoding.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::correlate::Correlator;
use crate::event::ObservationEvent;
use crate::ingest::listener::{ConnectionPermit, IngestListener};
use crate::observability::metrics;

/// Accept loop: one task per ingest connection, until shutdown.
pub async fn run(
    listener: IngestListener,
    correlator: Arc<Correlator>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr, permit)) => {
                    let correlator = correlator.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, addr, permit, correlator).await;
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "Ingest accept failed");
                }
            },
            _ = shutdown.recv() => {
                tracing::info!("Ingest listener stopped");
                break;
            }
        }
    }
}

/// Decode newline-delimited JSON events until the host disconnects.
///
/// A malformed line is skipped; events for different exchanges may be
/// interleaved arbitrarily across connections.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    _permit: ConnectionPermit,
    correlator: Arc<Correlator>,
) {
    let mut lines = BufReader::new(stream).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ObservationEvent>(line) {
                    Ok(event) => correlator.handle_event(event),
                    Err(e) => {
                        tracing::warn!(
                            peer_addr = %addr,
                            error = %e,
                            "Discarding malformed observation event"
                        );
                        metrics::record_malformed_event();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(peer_addr = %addr, error = %e, "Ingest connection read error");
                break;
            }
        }
    }

    tracing::debug!(peer_addr = %addr, "Ingest connection closed");
}
