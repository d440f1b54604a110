//! Observer SDK for the mirror relay.
//!
//! Embedded in a host traffic tool to emit request/response observation
//! events to the relay's ingest surface as newline-delimited JSON.

mod client;

pub use client::{Exchange, ObserverClient};
