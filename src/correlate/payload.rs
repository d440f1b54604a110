//! Raw payload splitting: header block and body extraction.
//!
//! The host supplies a raw payload plus a byte offset marking where headers
//! end. These helpers never fail: out-of-range offsets and absent payloads
//! degrade to empty output.

/// Header lines of the payload, in order of appearance.
///
/// Lines are taken from the bytes before `body_offset`, split on CRLF or
/// bare LF; the blank separator line is dropped.
pub fn header_lines(raw: &str, body_offset: usize) -> Vec<String> {
    let bytes = raw.as_bytes();
    let end = body_offset.min(bytes.len());
    let head = String::from_utf8_lossy(&bytes[..end]);

    head.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Body of the payload: every byte from `body_offset` to the end.
///
/// Empty when the offset is out of range or the payload is absent.
pub fn extract_body(raw: Option<&str>, body_offset: usize) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let bytes = raw.as_bytes();
    if body_offset >= bytes.len() {
        return String::new();
    }
    String::from_utf8_lossy(&bytes[body_offset..]).into_owned()
}
