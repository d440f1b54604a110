//! WebSocket feed sink.
//!
//! Connects as a client to the downstream consumer and pushes one text
//! message per correlated pair. The minimal contract is fire-and-forget;
//! two config-gated hardenings are layered on top:
//!
//! - a byte-budget buffer holding records while disconnected, flushed on
//!   reconnect, oldest records evicted first;
//! - reconnect with jittered exponential backoff.
//!
//! A failed initial connection leaves the sink degraded (every send fails
//! or buffers) rather than aborting the process.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::SinkExt;
use rand::Rng;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::{DownstreamConfig, ReconnectConfig};
use crate::observability::metrics;
use crate::transport::{FeedSink, TransportError, TransportResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Persistent outbound WebSocket connection.
pub struct WebSocketSink {
    endpoint: String,
    reconnect: ReconnectConfig,
    stream: Option<WsStream>,
    buffer: VecDeque<String>,
    buffered_bytes: usize,
    max_buffer_bytes: usize,
    attempts: u32,
}

impl WebSocketSink {
    /// Establish the outbound connection.
    ///
    /// Setup failure is reported and yields a degraded sink; it does not
    /// abort startup.
    pub async fn connect(config: &DownstreamConfig) -> Self {
        let mut sink = Self {
            endpoint: config.endpoint.clone(),
            reconnect: config.reconnect.clone(),
            stream: None,
            buffer: VecDeque::new(),
            buffered_bytes: 0,
            max_buffer_bytes: config.buffer_on_disconnect_bytes,
            attempts: 0,
        };

        match connect_async(sink.endpoint.as_str()).await {
            Ok((stream, _response)) => {
                tracing::info!(endpoint = %sink.endpoint, "Downstream feed connected");
                metrics::record_feed_connected(true);
                sink.stream = Some(stream);
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %sink.endpoint,
                    error = %e,
                    "Failed to connect downstream feed, running degraded"
                );
                metrics::record_feed_connected(false);
            }
        }
        sink
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn buffered_records(&self) -> usize {
        self.buffer.len()
    }

    /// Hold a record while disconnected, within the byte budget.
    ///
    /// Oldest records are evicted first; a budget of zero disables
    /// buffering entirely (fire-and-forget).
    fn buffer_record(&mut self, record: String) {
        if self.max_buffer_bytes == 0 {
            return;
        }

        let len = record.len();
        while self.buffered_bytes + len > self.max_buffer_bytes {
            match self.buffer.pop_front() {
                Some(evicted) => self.buffered_bytes -= evicted.len(),
                None => break,
            }
        }

        if len <= self.max_buffer_bytes {
            self.buffered_bytes += len;
            self.buffer.push_back(record);
        }
    }

    /// Reconnect after a backoff delay and flush any buffered records.
    async fn try_reconnect(&mut self) -> TransportResult<()> {
        if !self.reconnect.enabled {
            return Err(TransportError::Connect("reconnect disabled".to_string()));
        }

        self.attempts = self.attempts.saturating_add(1);
        let delay = backoff_delay(
            self.attempts,
            self.reconnect.base_delay_ms,
            self.reconnect.max_delay_ms,
        );
        tracing::info!(
            endpoint = %self.endpoint,
            attempt = self.attempts,
            delay = ?delay,
            "Reconnecting downstream feed"
        );
        tokio::time::sleep(delay).await;

        match connect_async(self.endpoint.as_str()).await {
            Ok((stream, _response)) => {
                self.stream = Some(stream);
                self.attempts = 0;
                metrics::record_feed_connected(true);
                tracing::info!(endpoint = %self.endpoint, "Downstream feed reconnected");
                self.flush_buffer().await
            }
            Err(e) => {
                metrics::record_feed_connected(false);
                Err(TransportError::Connect(e.to_string()))
            }
        }
    }

    /// Drain the disconnect buffer onto a freshly connected stream.
    async fn flush_buffer(&mut self) -> TransportResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        tracing::debug!(buffered = self.buffer.len(), "Flushing buffered records");

        while let Some(record) = self.buffer.pop_front() {
            self.buffered_bytes -= record.len();
            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| TransportError::Send("stream lost during flush".to_string()))?;
            if let Err(e) = stream.send(Message::Text(record.clone().into())).await {
                // Keep the record for the next reconnect.
                self.buffered_bytes += record.len();
                self.buffer.push_front(record);
                self.stream = None;
                metrics::record_feed_connected(false);
                return Err(TransportError::Send(e.to_string()));
            }
        }
        Ok(())
    }
}

impl FeedSink for WebSocketSink {
    async fn send(&mut self, record: &str) -> TransportResult<()> {
        if let Some(stream) = self.stream.as_mut() {
            match stream.send(Message::Text(record.to_string().into())).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "Downstream send failed");
                    self.stream = None;
                    metrics::record_feed_connected(false);
                    self.buffer_record(record.to_string());
                    return match self.try_reconnect().await {
                        // The record went out with the buffer flush.
                        Ok(()) => Ok(()),
                        Err(_) if self.max_buffer_bytes > 0 => {
                            // Retained for a later reconnect.
                            Ok(())
                        }
                        Err(_) => Err(TransportError::Send(e.to_string())),
                    };
                }
            }
        }

        // Disconnected: buffer and attempt to come back.
        self.buffer_record(record.to_string());
        match self.try_reconnect().await {
            Ok(()) => Ok(()),
            Err(_) if self.max_buffer_bytes > 0 => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn close(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            let _ = stream.send(Message::Close(None)).await;
        }
        self.stream = None;
        tracing::info!("Downstream feed closed");
    }
}

impl std::fmt::Debug for WebSocketSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSink")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.stream.is_some())
            .field("buffered_records", &self.buffer.len())
            .finish()
    }
}

/// Exponential backoff with jitter (0 to 10% of the delay).
fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(exponential).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
