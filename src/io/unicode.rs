//! Character-offset helpers.
//!
//! Chunk sizes are measured in Unicode scalar values, not bytes. These
//! helpers translate character offsets into valid `str` slice positions so
//! splitting never lands inside a multi-byte sequence.

/// Number of characters (Unicode scalar values) in `s`.
#[must_use]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte position of the `n`th character, or `s.len()` when `n` is past the end.
///
/// # Examples
///
/// ```
/// use ragline::io::unicode::byte_offset;
///
/// let s = "Hello 世界";
/// assert_eq!(byte_offset(s, 6), 6);
/// assert_eq!(byte_offset(s, 7), 9);
/// assert_eq!(byte_offset(s, 100), s.len());
/// ```
#[must_use]
pub fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(pos, _)| pos)
}

/// Splits `s` after its first `n` characters.
#[must_use]
pub fn split_at_char(s: &str, n: usize) -> (&str, &str) {
    s.split_at(byte_offset(s, n))
}

/// Returns the last `n` characters of `s` (all of `s` if it is shorter).
#[must_use]
pub fn tail_chars(s: &str, n: usize) -> &str {
    let len = char_len(s);
    if n >= len {
        return s;
    }
    &s[byte_offset(s, len - n)..]
}

/// Validates that a byte slice is valid UTF-8.
///
/// # Errors
///
/// Returns the byte offset of the first invalid UTF-8 sequence.
pub fn validate_utf8(bytes: &[u8]) -> std::result::Result<&str, usize> {
    std::str::from_utf8(bytes).map_err(|e| e.valid_up_to())
}
