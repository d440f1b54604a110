//! Correlation engine subsystem.
//!
//! # Data Flow
//! ```text
//! ObservationEvent
//!     → key.rs (pair key from opaque tag or derived attributes)
//!     → table.rs (admit pending request / resolve on response)
//!     → engine.rs (build Correlated Pair, latency, feed counter)
//!     → feed encoder → transport queue
//! ```
//!
//! # Design Decisions
//! - The pending table is the single shared mutable resource; it is a
//!   sharded concurrent map, and no lock is held across encode or send
//! - Pair keys are strings under both strategies so the table is oblivious
//!   to the strategy in use
//! - Responses that resolve nothing are warnings, never errors

pub mod engine;
pub mod key;
pub mod payload;
pub mod table;

pub use engine::Correlator;
pub use key::{DerivedKeyStrategy, OpaqueTagStrategy, PairKeyStrategy};
pub use table::{PendingExchange, PendingTable};
