//! The correlator: per-event control logic.
//!
//! # Responsibilities
//! - Admit `RequestSeen` events into the pending table
//! - Resolve `ResponseSeen` events into correlated pairs
//! - Mint feed ids (atomic, exactly one per paired exchange)
//! - Compute latency from admission to response observation
//! - Reconstruct URLs when no structured form is available
//! - Enqueue encoded records for the transport sink
//!
//! # Design Decisions
//! - `handle_event` never blocks: table operations are shard-local,
//!   enqueueing is `try_send` on a bounded queue (full queue drops the
//!   record with a warning, backpressure never reaches the table)
//! - Every failure is per-exchange: unmatched responses, missing payloads
//!   and full queues are logged and counted, never propagated

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::correlate::key::PairKeyStrategy;
use crate::correlate::payload::{extract_body, header_lines};
use crate::correlate::table::{PendingExchange, PendingTable};
use crate::event::ObservationEvent;
use crate::feed::encoder::encode_record;
use crate::feed::record::{CorrelatedPair, UNMATCHED_LATENCY_MS};
use crate::filter::DomainFilter;
use crate::observability::metrics;

/// Event-driven correlation engine.
///
/// Invoked once per observation event; events for different exchanges may
/// arrive concurrently, so all state here is lock-minimal and shared.
pub struct Correlator {
    table: PendingTable,
    strategy: Arc<dyn PairKeyStrategy>,
    filter: Arc<ArcSwap<DomainFilter>>,
    feed_counter: AtomicU64,
    feed_tx: mpsc::Sender<String>,
}

impl Correlator {
    pub fn new(
        table: PendingTable,
        strategy: Arc<dyn PairKeyStrategy>,
        filter: Arc<ArcSwap<DomainFilter>>,
        feed_tx: mpsc::Sender<String>,
    ) -> Self {
        Self {
            table,
            strategy,
            filter,
            feed_counter: AtomicU64::new(0),
            feed_tx,
        }
    }

    /// Number of pairs emitted so far.
    pub fn emitted(&self) -> u64 {
        self.feed_counter.load(Ordering::Relaxed)
    }

    /// Process one observation event.
    pub fn handle_event(&self, event: ObservationEvent) {
        match event {
            ObservationEvent::RequestSeen {
                exchange,
                raw,
                body_offset,
                url,
                observed_at_ms,
            } => {
                let key = self.strategy.key_for_request(&exchange);
                let admitted_at_ms = observed_at_ms.unwrap_or_else(crate::now_ms);

                tracing::debug!(
                    exchange_id = exchange.id,
                    pair_key = %key,
                    method = %exchange.method,
                    "Request admitted"
                );

                let pending = PendingExchange {
                    exchange,
                    raw,
                    body_offset,
                    url,
                    admitted_at_ms,
                };
                if let Some(replaced) = self.table.admit(key.clone(), pending) {
                    // Derived-key collision hazard: the overwritten request
                    // can never be matched again.
                    tracing::warn!(
                        pair_key = %key,
                        replaced_exchange_id = replaced.exchange.id,
                        "Pending exchange replaced under the same key"
                    );
                }
            }

            ObservationEvent::ResponseSeen {
                exchange,
                raw,
                body_offset,
                status,
                observed_at_ms,
            } => {
                let Some(key) = self.strategy.key_for_response(&exchange) else {
                    tracing::warn!(
                        exchange_id = exchange.id,
                        "Missing pair key for response"
                    );
                    metrics::record_orphaned_response();
                    return;
                };

                let pending = self.table.resolve(&key);
                let resolved_at_ms = observed_at_ms.unwrap_or_else(crate::now_ms);
                let latency_ms = pending
                    .as_ref()
                    .map(|p| resolved_at_ms as i64 - p.admitted_at_ms as i64)
                    .unwrap_or(UNMATCHED_LATENCY_MS);

                let Some(pending) = pending else {
                    tracing::warn!(
                        exchange_id = exchange.id,
                        pair_key = %key,
                        "Response matched no pending exchange"
                    );
                    metrics::record_orphaned_response();
                    return;
                };

                let (Some(req_raw), Some(res_raw)) = (pending.raw.as_deref(), raw.as_deref()) else {
                    let would_be = self.feed_counter.load(Ordering::Relaxed) + 1;
                    tracing::warn!(
                        feed_id = %format!("FEED-{}", would_be),
                        pair_key = %key,
                        "Missing request or response payload, record not emitted"
                    );
                    metrics::record_dropped("missing_payload");
                    return;
                };

                let request_headers = header_lines(req_raw, pending.body_offset);
                let url = resolve_url(&pending, &request_headers);

                if self.filter.load().is_blocked_url(&url) {
                    tracing::debug!(url = %url, "Pair dropped by domain filter");
                    metrics::record_dropped("blocked_domain");
                    return;
                }

                let feed_id = format!("FEED-{}", self.feed_counter.fetch_add(1, Ordering::Relaxed) + 1);

                let pair = CorrelatedPair {
                    feed_id: feed_id.clone(),
                    pair_key: key,
                    latency_ms,
                    method: pending.exchange.method.clone(),
                    url: url.clone(),
                    status_code: status,
                    request_body: extract_body(Some(req_raw), pending.body_offset),
                    request_headers,
                    response_headers: header_lines(res_raw, body_offset),
                    response_body: extract_body(Some(res_raw), body_offset),
                };

                let record = encode_record(&pair, self.strategy.key_in_record());
                match self.feed_tx.try_send(record) {
                    Ok(()) => {
                        metrics::record_pair_emitted(&pair.method, status);
                        tracing::info!(
                            feed_id = %feed_id,
                            method = %pair.method,
                            url = %url,
                            status = status,
                            latency_ms,
                            "Pair forwarded"
                        );
                    }
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(feed_id = %feed_id, "Feed queue full, record dropped");
                        metrics::record_dropped("queue_full");
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::warn!(feed_id = %feed_id, "Feed queue closed, record dropped");
                        metrics::record_dropped("queue_closed");
                    }
                }
            }
        }
    }
}

/// Reconstruct the exchange URL.
///
/// Prefers the structured URL from the request event. Falls back to the
/// destination triple plus the first path-bearing request-line token found
/// among the header lines (`/UNKNOWN` when none is found), then to the
/// literal `UNKNOWN_URL`. Always produces some string.
fn resolve_url(pending: &PendingExchange, request_headers: &[String]) -> String {
    if let Some(url) = &pending.url {
        return url.clone();
    }

    let ex = &pending.exchange;
    if let (Some(protocol), Some(host), Some(port)) = (&ex.protocol, &ex.host, ex.port) {
        let path = request_headers
            .iter()
            .filter_map(|line| line.split_whitespace().nth(1))
            .find(|token| token.starts_with('/'))
            .unwrap_or("/UNKNOWN");
        return format!("{}://{}:{}{}", protocol, host, port, path);
    }

    "UNKNOWN_URL".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyStrategyKind;
    use crate::correlate::key::strategy_from_config;
    use crate::event::ExchangeContext;
    use crate::feed::record::FEED_DELIMITER;

    fn exchange(id: u64) -> ExchangeContext {
        ExchangeContext {
            id,
            protocol: Some("https".to_string()),
            host: Some("example.com".to_string()),
            port: Some(443),
            method: "GET".to_string(),
            path: "/x".to_string(),
        }
    }

    fn request_seen(id: u64, observed_at_ms: u64) -> ObservationEvent {
        ObservationEvent::RequestSeen {
            exchange: exchange(id),
            raw: Some("GET /x HTTP/1.1\r\nHost: example.com\r\n\r\n".to_string()),
            body_offset: 38,
            url: Some("https://example.com/x".to_string()),
            observed_at_ms: Some(observed_at_ms),
        }
    }

    fn response_seen(id: u64, observed_at_ms: u64) -> ObservationEvent {
        ObservationEvent::ResponseSeen {
            exchange: exchange(id),
            raw: Some("HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHELLO".to_string()),
            body_offset: 38,
            status: 200,
            observed_at_ms: Some(observed_at_ms),
        }
    }

    fn correlator(
        kind: KeyStrategyKind,
        blocked: &[&str],
    ) -> (Correlator, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        let filter = DomainFilter::new(&blocked.iter().map(|d| d.to_string()).collect::<Vec<_>>());
        let correlator = Correlator::new(
            PendingTable::new(),
            strategy_from_config(kind),
            Arc::new(ArcSwap::from_pointee(filter)),
            tx,
        );
        (correlator, rx)
    }

    fn fields(record: &str) -> Vec<String> {
        record.split(FEED_DELIMITER).map(str::to_string).collect()
    }

    #[test]
    fn paired_exchange_emits_one_record() {
        let (correlator, mut rx) = correlator(KeyStrategyKind::OpaqueTag, &[]);

        correlator.handle_event(request_seen(1, 1_000));
        assert!(rx.try_recv().is_err(), "no output on request admission");

        correlator.handle_event(response_seen(1, 1_050));
        let record = rx.try_recv().expect("one record emitted");
        let f = fields(&record);

        assert_eq!(f[0], "PAIR_FEED:FEED-1");
        assert_eq!(f[2], "50", "latency is t1 - t0 exactly");
        assert_eq!(f[3], "GET");
        assert_eq!(f[4], "https://example.com/x");
        assert_eq!(f[5], "200");
        assert_eq!(f[9], "HELLO");

        assert!(rx.try_recv().is_err(), "exactly one record per pair");
    }

    #[test]
    fn feed_ids_strictly_increase() {
        let (correlator, mut rx) = correlator(KeyStrategyKind::OpaqueTag, &[]);

        for id in 1..=3 {
            correlator.handle_event(request_seen(id, 0));
            correlator.handle_event(response_seen(id, 10));
        }

        let ids: Vec<String> = (0..3).map(|_| fields(&rx.try_recv().unwrap())[0].clone()).collect();
        assert_eq!(ids, vec!["PAIR_FEED:FEED-1", "PAIR_FEED:FEED-2", "PAIR_FEED:FEED-3"]);
        assert_eq!(correlator.emitted(), 3);
    }

    #[test]
    fn unmatched_response_emits_nothing() {
        let (correlator, mut rx) = correlator(KeyStrategyKind::OpaqueTag, &[]);
        correlator.handle_event(response_seen(9, 1_000));
        assert!(rx.try_recv().is_err());
        assert_eq!(correlator.emitted(), 0);
    }

    #[test]
    fn opaque_tags_never_cross_pair_identical_requests() {
        let (correlator, mut rx) = correlator(KeyStrategyKind::OpaqueTag, &[]);

        // Two concurrent exchanges, identical host/method/path, different ids.
        correlator.handle_event(request_seen(1, 1_000));
        correlator.handle_event(request_seen(2, 2_000));

        // Responses arrive out of order.
        correlator.handle_event(response_seen(2, 2_030));
        correlator.handle_event(response_seen(1, 1_070));

        let first = fields(&rx.try_recv().unwrap());
        let second = fields(&rx.try_recv().unwrap());

        // Each response resolved its own request's timing.
        assert_eq!(first[2], "30");
        assert_eq!(second[2], "70");
    }

    #[test]
    fn derived_key_second_request_wins_the_table() {
        let (correlator, mut rx) = correlator(KeyStrategyKind::DerivedKey, &[]);

        // Identical host/method/path: one key, second admit overwrites.
        correlator.handle_event(request_seen(1, 1_000));
        correlator.handle_event(request_seen(2, 4_000));

        // The first request's true response resolves against the SECOND
        // admission (documented hazard): latency is computed from t=4000.
        correlator.handle_event(response_seen(1, 4_100));
        let cross_paired = fields(&rx.try_recv().unwrap());
        // Derived-key records carry no pair key field: latency follows the
        // feed id directly.
        assert_eq!(cross_paired[1], "100");
        assert_eq!(cross_paired[2], "GET");

        // The second response finds nothing left.
        correlator.handle_event(response_seen(2, 4_200));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn missing_response_payload_drops_record() {
        let (correlator, mut rx) = correlator(KeyStrategyKind::OpaqueTag, &[]);
        correlator.handle_event(request_seen(1, 0));
        correlator.handle_event(ObservationEvent::ResponseSeen {
            exchange: exchange(1),
            raw: None,
            body_offset: 0,
            status: 200,
            observed_at_ms: Some(10),
        });
        assert!(rx.try_recv().is_err());
        // No feed id consumed: the next emitted pair is FEED-1.
        assert_eq!(correlator.emitted(), 0);

        correlator.handle_event(request_seen(2, 0));
        correlator.handle_event(response_seen(2, 10));
        assert!(fields(&rx.try_recv().unwrap())[0].ends_with("FEED-1"));
    }

    #[test]
    fn blocked_domain_drops_pair() {
        let (correlator, mut rx) = correlator(KeyStrategyKind::OpaqueTag, &["example.com"]);
        correlator.handle_event(request_seen(1, 0));
        correlator.handle_event(response_seen(1, 10));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn url_fallback_from_destination_triple() {
        let pending = PendingExchange {
            exchange: exchange(1),
            raw: None,
            body_offset: 0,
            url: None,
            admitted_at_ms: 0,
        };
        let headers = vec![
            "GET /fallback/path HTTP/1.1".to_string(),
            "Host: example.com".to_string(),
        ];
        assert_eq!(resolve_url(&pending, &headers), "https://example.com:443/fallback/path");
    }

    #[test]
    fn url_fallback_defaults_path_to_unknown() {
        let pending = PendingExchange {
            exchange: exchange(1),
            raw: None,
            body_offset: 0,
            url: None,
            admitted_at_ms: 0,
        };
        let headers = vec!["Host: example.com".to_string()];
        assert_eq!(resolve_url(&pending, &headers), "https://example.com:443/UNKNOWN");
    }

    #[test]
    fn url_fallback_without_destination_is_placeholder() {
        let pending = PendingExchange {
            exchange: ExchangeContext {
                id: 1,
                protocol: None,
                host: None,
                port: None,
                method: "GET".to_string(),
                path: "/x".to_string(),
            },
            raw: None,
            body_offset: 0,
            url: None,
            admitted_at_ms: 0,
        };
        assert_eq!(resolve_url(&pending, &[]), "UNKNOWN_URL");
    }

    #[test]
    fn full_queue_drops_record_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let correlator = Correlator::new(
            PendingTable::new(),
            strategy_from_config(KeyStrategyKind::OpaqueTag),
            Arc::new(ArcSwap::from_pointee(DomainFilter::default())),
            tx,
        );

        for id in 1..=2 {
            correlator.handle_event(request_seen(id, 0));
            correlator.handle_event(response_seen(id, 10));
        }

        // Capacity one: the first record queued, the second was dropped.
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        // Both pairs consumed feed ids.
        assert_eq!(correlator.emitted(), 2);
    }
}
