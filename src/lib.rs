//! Mirror Relay Library
//!
//! Correlates request/response observation events from an intercepting
//! traffic tool into paired records and forwards them to a downstream
//! consumer over a persistent WebSocket feed.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 MIRROR RELAY                    │
//!  Observation events  │  ┌─────────┐   ┌───────────┐   ┌────────────┐  │
//!  ────────────────────┼─▶│ ingest  │──▶│ correlate │──▶│   feed     │  │
//!  (host traffic tool) │  │listener │   │  engine   │   │  encoder   │  │
//!                      │  └─────────┘   └─────┬─────┘   └─────┬──────┘  │
//!                      │                      │               │         │
//!                      │              ┌───────▼──────┐  ┌─────▼──────┐  │   Downstream
//!                      │              │   pending    │  │ transport  │──┼──▶ consumer
//!                      │              │    table     │  │   sink     │  │   (WebSocket)
//!                      │              └──────────────┘  └────────────┘  │
//!                      │                                                │
//!                      │  ┌──────────────────────────────────────────┐  │
//!                      │  │          Cross-Cutting Concerns           │  │
//!                      │  │  config · filter · observability ·        │  │
//!                      │  │  lifecycle                                │  │
//!                      │  └──────────────────────────────────────────┘  │
//!                      └────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod correlate;
pub mod event;
pub mod feed;
pub mod ingest;
pub mod transport;

// Cross-cutting concerns
pub mod config;
pub mod filter;
pub mod lifecycle;
pub mod observability;

pub use config::RelayConfig;
pub use correlate::Correlator;
pub use lifecycle::Shutdown;

/// Current wall-clock time as unix milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
