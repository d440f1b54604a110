//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: load config → validate → connect feed → spawn tasks → listen
//! Shutdown: SIGTERM/SIGINT → broadcast signal → tasks drain → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
