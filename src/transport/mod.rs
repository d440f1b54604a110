//! Outbound transport subsystem.
//!
//! # Data Flow
//! ```text
//! correlator → bounded record queue → feed pump task → FeedSink → downstream
//! ```
//!
//! # Design Decisions
//! - One sink task consumes the queue, so records leave in enqueue order and
//!   the potentially blocking WebSocket send never runs under a table lock
//! - Send failure is reported and the record dropped; delivery is
//!   best-effort mirroring, hardened only by the sink's own buffering
//! - A full queue is the correlator's problem (drop + warn), never the
//!   sink's

pub mod ws;

use std::future::Future;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::observability::metrics;

/// Errors from the outbound connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connecting (or reconnecting) to the downstream endpoint failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A send on the established connection failed.
    #[error("send failed: {0}")]
    Send(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Delivers one encoded record to the outbound connection.
pub trait FeedSink: Send {
    /// Deliver a record. Implementations may buffer internally; an `Err`
    /// means the record did not reach the wire and was not retained.
    fn send(&mut self, record: &str) -> impl Future<Output = TransportResult<()>> + Send;

    /// Release the connection on shutdown.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Drain the record queue into the sink until shutdown or queue close.
///
/// Failures are per-record: logged, counted, and the pump moves on.
pub async fn run_feed_pump<S: FeedSink>(
    mut sink: S,
    mut records: mpsc::Receiver<String>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            maybe = records.recv() => match maybe {
                Some(record) => {
                    if let Err(e) = sink.send(&record).await {
                        tracing::warn!(error = %e, "Feed delivery failed, record dropped");
                        metrics::record_transport_error();
                    }
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
    sink.close().await;
    tracing::info!("Feed pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingSink {
        sent: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl FeedSink for RecordingSink {
        async fn send(&mut self, record: &str) -> TransportResult<()> {
            if self.fail {
                return Err(TransportError::Send("injected".to_string()));
            }
            self.sent.lock().unwrap().push(record.to_string());
            Ok(())
        }

        async fn close(&mut self) {}
    }

    #[tokio::test]
    async fn pump_forwards_records_in_order() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink { sent: sent.clone(), fail: false };
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send("first".to_string()).await.unwrap();
        tx.send("second".to_string()).await.unwrap();
        drop(tx);

        run_feed_pump(sink, rx, shutdown_rx).await;
        assert_eq!(*sent.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn pump_survives_send_failures() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink { sent: sent.clone(), fail: true };
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send("lost".to_string()).await.unwrap();
        drop(tx);

        // Must run to completion despite every send failing.
        run_feed_pump(sink, rx, shutdown_rx).await;
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pump_stops_on_shutdown_signal() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink { sent, fail: false };
        let (_tx, rx) = mpsc::channel::<String>(8);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let pump = tokio::spawn(run_feed_pump(sink, rx, shutdown_rx));
        shutdown_tx.send(()).unwrap();
        pump.await.unwrap();
    }
}
