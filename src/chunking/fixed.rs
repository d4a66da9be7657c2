//! Fixed-size chunking.
//!
//! Slides a window of `chunk_size` characters across the content with no
//! overlap. The final chunk may be shorter. Window edges are counted in
//! characters, so a multi-byte character is never split.

use crate::chunking::traits::Segmenter;
use crate::core::ChunkSequence;
use crate::error::{ChunkingError, Result};

/// Fixed-size chunker.
///
/// # Examples
///
/// ```
/// use ragline::chunking::{FixedChunker, Segmenter};
///
/// let chunker = FixedChunker::with_size(4);
/// let chunks = chunker.segment("0123456789").unwrap();
/// assert_eq!(chunks, ["0123", "4567", "89"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedChunker {
    /// Window size in characters.
    chunk_size: usize,
}

impl FixedChunker {
    /// Creates a fixed chunker with a window of `chunk_size` characters.
    #[must_use]
    pub const fn with_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Window size in characters.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Segmenter for FixedChunker {
    fn segment(&self, text: &str) -> Result<ChunkSequence> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig {
                reason: "chunk_size must be > 0".to_string(),
            }
            .into());
        }

        let mut chunks = ChunkSequence::new();
        let mut start = 0;
        let mut count = 0;

        for (pos, _) in text.char_indices() {
            if count == self.chunk_size {
                chunks.push(&text[start..pos]);
                start = pos;
                count = 0;
            }
            count += 1;
        }
        if start < text.len() {
            chunks.push(&text[start..]);
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }

    fn description(&self) -> &'static str {
        "Fixed-size character windows without overlap"
    }
}
