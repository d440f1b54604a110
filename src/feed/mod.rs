//! Feed records and wire framing.
//!
//! A completed pair becomes exactly one delimited text record, one WebSocket
//! message downstream. Encoding is pure; the feed counter lives with the
//! correlator.

pub mod encoder;
pub mod record;

pub use encoder::encode_record;
pub use record::{CorrelatedPair, FEED_DELIMITER, FEED_PREFIX};
