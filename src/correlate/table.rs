//! Pending exchange table.
//!
//! Maps pair keys to requests awaiting their response. Admit/resolve are
//! dispatched concurrently by the host, so the table is a sharded concurrent
//! map; lock scope is the shard operation itself and nothing more.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::event::ExchangeContext;
use crate::observability::metrics;

/// A request admitted but not yet matched to a response.
///
/// Owned exclusively by the table from admission until resolution or
/// eviction; no other component mutates it.
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub exchange: ExchangeContext,
    /// Raw request payload, absent under a misbehaving host.
    pub raw: Option<String>,
    /// Header/body boundary offset into `raw`.
    pub body_offset: usize,
    /// Structured URL, when the host supplied one.
    pub url: Option<String>,
    /// Admission timestamp (unix milliseconds).
    pub admitted_at_ms: u64,
}

/// Concurrent map from pair key to pending exchange.
#[derive(Debug, Clone, Default)]
pub struct PendingTable {
    inner: Arc<DashMap<String, PendingExchange>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self { inner: Arc::new(DashMap::new()) }
    }

    /// Insert a pending exchange, replacing any entry under the same key.
    ///
    /// Returns the replaced entry, if any. Replacement is the exact locus of
    /// the derived-key collision hazard: the overwritten request can never be
    /// matched again.
    pub fn admit(&self, key: String, pending: PendingExchange) -> Option<PendingExchange> {
        let replaced = self.inner.insert(key, pending);
        metrics::record_pending_size(self.inner.len());
        replaced
    }

    /// Remove and return the entry for `key`, or `None` for an unmatched
    /// response.
    pub fn resolve(&self, key: &str) -> Option<PendingExchange> {
        let resolved = self.inner.remove(key).map(|(_, pending)| pending);
        metrics::record_pending_size(self.inner.len());
        resolved
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop entries admitted more than `max_age` ago. Returns how many were
    /// evicted.
    pub fn evict_stale(&self, max_age: Duration, now_ms: u64) -> usize {
        let cutoff = now_ms.saturating_sub(max_age.as_millis() as u64);
        let before = self.inner.len();
        self.inner.retain(|key, pending| {
            let keep = pending.admitted_at_ms >= cutoff;
            if !keep {
                tracing::warn!(
                    pair_key = %key,
                    admitted_at_ms = pending.admitted_at_ms,
                    "Evicting stale pending exchange, response never arrived"
                );
            }
            keep
        });
        let evicted = before - self.inner.len();
        if evicted > 0 {
            metrics::record_evictions(evicted);
            metrics::record_pending_size(self.inner.len());
        }
        evicted
    }
}

/// Background task that bounds table memory when responses never arrive.
///
/// Optional hardening: only spawned when `max_pending_age` is configured.
pub struct StaleSweeper {
    table: PendingTable,
    max_age: Duration,
    interval: Duration,
}

impl StaleSweeper {
    pub fn new(table: PendingTable, max_age: Duration, interval: Duration) -> Self {
        Self { table, max_age, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            max_age_secs = self.max_age.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Stale pending sweeper started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.table.evict_stale(self.max_age, crate::now_ms());
                    if evicted > 0 {
                        tracing::info!(evicted, remaining = self.table.len(), "Stale sweep complete");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Stale sweeper stopped");
                    break;
                }
            }
        }
    }
}
