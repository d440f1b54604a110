//! Record framing.
//!
//! Serializes one correlated pair into one delimited text frame. Pure
//! function: the same pair always yields the same record.

use crate::feed::record::{CorrelatedPair, FEED_DELIMITER, FEED_PREFIX};

/// Encode a pair as a single `#massmirror#`-delimited frame.
///
/// Field order is fixed: feed id, pair key (opaque-tag strategy only),
/// latency, method, url, status, request headers, request body, response
/// headers, response body. Header sequences are newline-joined; no field is
/// escaped.
pub fn encode_record(pair: &CorrelatedPair, include_pair_key: bool) -> String {
    let mut fields: Vec<String> = Vec::with_capacity(10);
    fields.push(format!("{}{}", FEED_PREFIX, pair.feed_id));
    if include_pair_key {
        fields.push(pair.pair_key.clone());
    }
    fields.push(pair.latency_ms.to_string());
    fields.push(pair.method.clone());
    fields.push(pair.url.clone());
    fields.push(pair.status_code.to_string());
    fields.push(pair.request_headers.join("\n"));
    fields.push(pair.request_body.clone());
    fields.push(pair.response_headers.join("\n"));
    fields.push(pair.response_body.clone());
    fields.join(FEED_DELIMITER)
}
