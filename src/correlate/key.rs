//! Pair key strategies.
//!
//! A strategy must produce the same key for a `RequestSeen` and its true
//! matching `ResponseSeen`, and should produce distinct keys for unrelated
//! exchanges. Two strategies exist:
//!
//! - **Opaque tag** (preferred): a UUID v4 is minted when the request is
//!   admitted and held in an engine-owned side map keyed by the host's
//!   exchange id. Collisions are cryptographically negligible; concurrent
//!   identical requests never collide.
//! - **Derived key** (fallback): `host + "|" + method + "|" + path` computed
//!   from attributes present on both events. Works without any per-exchange
//!   identity support, but two concurrent exchanges with identical
//!   host/method/path share a key: the second admitted request overwrites the
//!   first in the pending table and the first request's true response can be
//!   misattributed. This is a documented hazard of the strategy, not a bug.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::KeyStrategyKind;
use crate::event::ExchangeContext;

/// Derives the correlation key that matches a response back to its request.
pub trait PairKeyStrategy: Send + Sync + std::fmt::Debug {
    /// Key under which a freshly observed request is admitted.
    fn key_for_request(&self, exchange: &ExchangeContext) -> String;

    /// Key under which a response should resolve, or `None` when the
    /// strategy has no record of the exchange.
    fn key_for_response(&self, exchange: &ExchangeContext) -> Option<String>;

    /// Whether minted keys are included in the wire record.
    fn key_in_record(&self) -> bool;
}

/// Build the configured strategy.
pub fn strategy_from_config(kind: KeyStrategyKind) -> Arc<dyn PairKeyStrategy> {
    match kind {
        KeyStrategyKind::OpaqueTag => Arc::new(OpaqueTagStrategy::new()),
        KeyStrategyKind::DerivedKey => Arc::new(DerivedKeyStrategy),
    }
}

/// Mints a unique tag per exchange, remembered in a side map owned by the
/// engine (`exchange id -> tag`), so no host-side mutation is required.
#[derive(Debug, Default)]
pub struct OpaqueTagStrategy {
    tags: DashMap<u64, String>,
}

impl OpaqueTagStrategy {
    pub fn new() -> Self {
        Self { tags: DashMap::new() }
    }

    /// Number of exchanges currently awaiting their response.
    pub fn outstanding(&self) -> usize {
        self.tags.len()
    }
}

impl PairKeyStrategy for OpaqueTagStrategy {
    fn key_for_request(&self, exchange: &ExchangeContext) -> String {
        let tag = Uuid::new_v4().to_string();
        // A second request under the same exchange id abandons the old tag,
        // same as the table's insert-or-replace semantics.
        self.tags.insert(exchange.id, tag.clone());
        tag
    }

    fn key_for_response(&self, exchange: &ExchangeContext) -> Option<String> {
        self.tags.remove(&exchange.id).map(|(_, tag)| tag)
    }

    fn key_in_record(&self) -> bool {
        true
    }
}

/// Computes the key from request attributes available on both events.
#[derive(Debug, Clone, Copy)]
pub struct DerivedKeyStrategy;

impl DerivedKeyStrategy {
    fn derive(exchange: &ExchangeContext) -> String {
        format!(
            "{}|{}|{}",
            exchange.host.as_deref().unwrap_or(""),
            exchange.method,
            exchange.path
        )
    }
}

impl PairKeyStrategy for DerivedKeyStrategy {
    fn key_for_request(&self, exchange: &ExchangeContext) -> String {
        Self::derive(exchange)
    }

    fn key_for_response(&self, exchange: &ExchangeContext) -> Option<String> {
        Some(Self::derive(exchange))
    }

    fn key_in_record(&self) -> bool {
        false
    }
}
