//! Approximate token accounting.
//!
//! Converts between word, character and token counts using fixed
//! calibration ratios. These are not tokenizer outputs: every budget check
//! built on them is approximate and tolerates small overshoot.

/// Words per token (3/4 of a word is one token).
pub const WORDS_PER_TOKEN: f64 = 0.75;

/// Characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimates the token count of `words` words: `floor(words / 0.75)`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn words_to_tokens(words: usize) -> usize {
    (words as f64 / WORDS_PER_TOKEN).floor() as usize
}

/// Estimates the number of words covered by `tokens` tokens.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn tokens_to_words(tokens: usize) -> f64 {
    tokens as f64 * WORDS_PER_TOKEN
}

/// Estimates the number of characters covered by `tokens` tokens.
#[must_use]
pub const fn tokens_to_chars(tokens: usize) -> usize {
    tokens * CHARS_PER_TOKEN
}

/// Estimates the token count of `chars` characters: `floor(chars / 4)`.
#[must_use]
pub const fn chars_to_tokens(chars: usize) -> usize {
    chars / CHARS_PER_TOKEN
}

/// Counts whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimates the token count of a piece of text from its word count.
#[must_use]
pub fn estimate_text_tokens(text: &str) -> usize {
    words_to_tokens(word_count(text))
}
