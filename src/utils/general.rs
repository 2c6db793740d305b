//! Text helpers.

/// Marker appended to truncated text.
pub const TRUNCATION_MARKER: &str = "...";

const MARKER_LEN: usize = 3;

/// Longest UTF-8 continuation run we back off over before giving up.
const MAX_BACKOFF: usize = 6;

/// Truncates `text` to at most `max_length` characters, replacing the tail
/// with `...`.
///
/// Counts code points, so a multi-byte character is never split. Text that
/// already fits, and limits too small to hold the marker, leave `text`
/// unchanged.
pub fn truncate(text: &str, max_length: usize) -> String {
    if max_length <= MARKER_LEN {
        return text.to_string();
    }
    let char_count = text.chars().count();
    if char_count <= max_length || char_count <= MARKER_LEN {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(max_length - MARKER_LEN).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Truncates raw bytes that may not be valid UTF-8.
///
/// Cuts at `max_length - 3` bytes, then backs off while the cut would land
/// inside a multi-byte sequence (at most six bytes), decodes lossily and
/// appends `...`.
pub fn truncate_bytes(bytes: &[u8], max_length: usize) -> String {
    if max_length <= MARKER_LEN || bytes.len() <= max_length || bytes.len() <= MARKER_LEN {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    let mut cut = max_length - MARKER_LEN;
    let mut steps = 0;
    while cut > 0 && steps < MAX_BACKOFF && is_continuation(bytes[cut]) {
        cut -= 1;
        steps += 1;
    }

    let mut truncated = String::from_utf8_lossy(&bytes[..cut]).into_owned();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}
