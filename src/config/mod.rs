//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → hot-swappable parts (domain filter) applied atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the domain filter is hot-reloadable; transport and correlation
//!   settings require a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::CorrelationConfig;
pub use schema::DownstreamConfig;
pub use schema::IngestConfig;
pub use schema::KeyStrategyKind;
pub use schema::ReconnectConfig;
pub use schema::RelayConfig;
