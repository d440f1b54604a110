//! Observation-event ingest subsystem.
//!
//! # Data Flow
//! ```text
//! host traffic tool
//!     → TCP connection (listener.rs, semaphore backpressure)
//!     → newline-delimited JSON events (session.rs)
//!     → correlator
//! ```
//!
//! # Design Decisions
//! - Malformed lines are skipped with a warning; one bad event never tears
//!   down the connection
//! - Connection limit enforced with a permit held for the connection's
//!   lifetime

pub mod listener;
pub mod session;

pub use listener::IngestListener;
