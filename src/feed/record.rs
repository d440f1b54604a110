//! The correlated pair record.

/// Literal delimiter joining record fields on the wire.
///
/// Fields are not escaped; a header or body containing this sequence
/// corrupts framing downstream. Known limitation, kept as-is.
pub const FEED_DELIMITER: &str = "#massmirror#";

/// Prefix marking the first field of every record.
pub const FEED_PREFIX: &str = "PAIR_FEED:";

/// Latency sentinel for a response whose pending exchange was not found.
pub const UNMATCHED_LATENCY_MS: i64 = -1;

/// A fully matched request/response pair, ready to serialize.
///
/// Created once by the correlator at the moment a response resolves a
/// pending entry; immutable; consumed once by the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatedPair {
    /// Strictly increasing per-process feed identifier ("FEED-1", "FEED-2", ...).
    pub feed_id: String,
    /// The key that matched the two halves.
    pub pair_key: String,
    /// Milliseconds between request admission and response observation.
    pub latency_ms: i64,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub request_headers: Vec<String>,
    pub request_body: String,
    pub response_headers: Vec<String>,
    pub response_body: String,
}
