//! Observation events delivered by the traffic-capture collaborator.
//!
//! # Collaborator Contract
//! For every exchange the host tool must deliver exactly one `RequestSeen`
//! strictly before the matching `ResponseSeen`, carrying the same
//! `exchange.id` on both. Raw payloads come with a byte offset marking the
//! header/body boundary; requests expose a parsed method, responses a status
//! code. The destination triple (protocol, host, port) is optional and only
//! consulted for URL reconstruction.

use serde::{Deserialize, Serialize};

/// Per-exchange context available on both halves of an exchange.
///
/// `id` is the host tool's stable identity for the exchange. It is the
/// carrier for the opaque correlation tag: the engine keeps its own
/// `id -> tag` mapping rather than mutating any host-side object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeContext {
    /// Host-assigned exchange identity, stable from request to response.
    pub id: u64,

    /// Destination protocol ("http" / "https"), if known.
    #[serde(default)]
    pub protocol: Option<String>,

    /// Destination host, if known.
    #[serde(default)]
    pub host: Option<String>,

    /// Destination port, if known.
    #[serde(default)]
    pub port: Option<u16>,

    /// Parsed request method.
    pub method: String,

    /// Request path as it appeared on the request line.
    pub path: String,
}

/// A notification that a request or response has been observed.
///
/// Events arrive as newline-delimited JSON on the ingest connection, tagged
/// by `kind`. Raw payloads may be absent under a misbehaving host; that case
/// is handled per-exchange, never fatally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservationEvent {
    /// A request has been observed; its response will arrive later, out of
    /// order relative to other exchanges.
    RequestSeen {
        exchange: ExchangeContext,
        /// Raw request payload (headers and body).
        #[serde(default)]
        raw: Option<String>,
        /// Byte offset where headers end and the body begins.
        #[serde(default)]
        body_offset: usize,
        /// Structured absolute URL, when the host could parse one.
        #[serde(default)]
        url: Option<String>,
        /// Host-reported observation time (unix milliseconds).
        #[serde(default)]
        observed_at_ms: Option<u64>,
    },

    /// The response half of a previously observed exchange.
    ResponseSeen {
        exchange: ExchangeContext,
        #[serde(default)]
        raw: Option<String>,
        #[serde(default)]
        body_offset: usize,
        /// Parsed response status code.
        status: u16,
        #[serde(default)]
        observed_at_ms: Option<u64>,
    },
}

impl ObservationEvent {
    /// The exchange context carried by either event variant.
    pub fn exchange(&self) -> &ExchangeContext {
        match self {
            ObservationEvent::RequestSeen { exchange, .. } => exchange,
            ObservationEvent::ResponseSeen { exchange, .. } => exchange,
        }
    }
}
