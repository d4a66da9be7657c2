//! Chunk sequences.
//!
//! A [`ChunkSequence`] is the ordered list of text fragments produced by a
//! segmenter and reshaped by the normalizer. It is the only structure that
//! crosses the segmenter/normalizer boundary. Chunk order is meaningful and
//! content is never rewritten, only re-split or re-joined.

use crate::io::unicode::char_len;
use crate::tokens::chars_to_tokens;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Ordered sequence of text chunks.
///
/// # Examples
///
/// ```
/// use ragline::core::ChunkSequence;
///
/// let chunks = ChunkSequence::from(vec!["a".to_string(), "b".to_string()]);
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks.join("\n"), "a\nb");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkSequence {
    chunks: Vec<String>,
}

impl ChunkSequence {
    /// Creates an empty sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the sequence holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Appends a chunk.
    pub fn push(&mut self, chunk: impl Into<String>) {
        self.chunks.push(chunk.into());
    }

    /// Appends every chunk of `other`.
    pub fn extend(&mut self, other: Self) {
        self.chunks.extend(other.chunks);
    }

    /// Iterates over chunks in order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.chunks.iter()
    }

    /// Borrows the chunks as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.chunks
    }

    /// Consumes the sequence, returning the chunks.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.chunks
    }

    /// Joins all chunks with `separator`.
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        self.chunks.join(separator)
    }

    /// Total number of characters across all chunks.
    #[must_use]
    pub fn total_chars(&self) -> usize {
        self.chunks.iter().map(|c| char_len(c)).sum()
    }

    /// Estimated token count of the whole sequence (4 chars per token).
    #[must_use]
    pub fn estimate_tokens(&self) -> usize {
        chars_to_tokens(self.total_chars())
    }
}

impl From<Vec<String>> for ChunkSequence {
    fn from(chunks: Vec<String>) -> Self {
        Self { chunks }
    }
}

impl From<Vec<&str>> for ChunkSequence {
    fn from(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks.into_iter().map(str::to_string).collect(),
        }
    }
}

impl FromIterator<String> for ChunkSequence {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ChunkSequence {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChunkSequence {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

impl Index<usize> for ChunkSequence {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        &self.chunks[index]
    }
}

impl PartialEq<[&str]> for ChunkSequence {
    fn eq(&self, other: &[&str]) -> bool {
        self.chunks.len() == other.len() && self.chunks.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for ChunkSequence {
    fn eq(&self, other: &[&str; N]) -> bool {
        self == other.as_slice()
    }
}
