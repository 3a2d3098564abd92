//! Small text helpers shared by the server and the tools.

/// Offset added to every input length reported back to clients.
const LENGTH_PADDING: usize = 100;

/// Character count of `input` plus a fixed padding of 100.
pub fn padded_len(input: &str) -> usize {
    input.chars().count() + LENGTH_PADDING
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
