//! Chunk-length normalization.
//!
//! A single forward pass over a work queue. Short chunks absorb the chunks
//! that follow them (joined with a single space) until the target is reached;
//! the chunk crossing the target is split at the exact character offset and
//! its remainder goes back to the front of the queue. Long chunks are cut at
//! the target and their remainder is queued next. Nothing ever looks
//! backward, and no character is dropped or duplicated.

use crate::core::ChunkSequence;
use crate::error::{ChunkingError, Result};
use crate::io::unicode::{char_len, split_at_char};
use std::collections::VecDeque;

/// Separator inserted between merged chunks.
pub const MERGE_SEPARATOR: &str = " ";

/// Counters collected during one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Separators inserted while lengthening.
    pub merges: usize,
    /// Chunks cut at a character offset.
    pub splits: usize,
}

/// Evens out chunk lengths around a target size in characters.
///
/// # Examples
///
/// ```
/// use ragline::chunking::LengthNormalizer;
/// use ragline::core::ChunkSequence;
///
/// let normalizer = LengthNormalizer::new(10).unwrap();
/// let chunks = ChunkSequence::from(vec!["hi", "this is a longer piece of text exceeding ten chars"]);
/// let out = normalizer.normalize(chunks);
/// assert_eq!(&out[0], "hi this is");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LengthNormalizer {
    target: usize,
}

impl LengthNormalizer {
    /// Creates a normalizer for `target` characters per chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is zero.
    pub fn new(target: usize) -> Result<Self> {
        if target == 0 {
            return Err(ChunkingError::InvalidConfig {
                reason: "normalization target must be > 0".to_string(),
            }
            .into());
        }
        Ok(Self { target })
    }

    /// Target size in characters.
    #[must_use]
    pub const fn target(&self) -> usize {
        self.target
    }

    /// Normalizes `chunks`.
    #[must_use]
    pub fn normalize(&self, chunks: ChunkSequence) -> ChunkSequence {
        self.normalize_with_report(chunks).0
    }

    /// Normalizes `chunks` and reports how many merges and splits happened.
    #[must_use]
    pub fn normalize_with_report(&self, chunks: ChunkSequence) -> (ChunkSequence, NormalizeReport) {
        let input_len = chunks.len();
        let mut queue: VecDeque<String> = chunks.into_iter().collect();
        let mut output = ChunkSequence::new();
        let mut report = NormalizeReport::default();

        while let Some(chunk) = queue.pop_front() {
            let len = char_len(&chunk);
            if len < self.target {
                output.push(self.lengthen(chunk, len, &mut queue, &mut report));
            } else if len > self.target {
                let (head, tail) = split_at_char(&chunk, self.target);
                queue.push_front(tail.to_string());
                output.push(head);
                report.splits += 1;
            } else {
                output.push(chunk);
            }
        }

        tracing::debug!(
            target = self.target,
            input = input_len,
            output = output.len(),
            merges = report.merges,
            splits = report.splits,
            "normalized chunk lengths"
        );
        (output, report)
    }

    fn lengthen(
        &self,
        mut merged: String,
        mut total: usize,
        queue: &mut VecDeque<String>,
        report: &mut NormalizeReport,
    ) -> String {
        let sep_len = char_len(MERGE_SEPARATOR);

        while let Some(next) = queue.pop_front() {
            if total + sep_len >= self.target {
                queue.push_front(next);
                break;
            }

            let room = self.target - total - sep_len;
            let next_len = char_len(&next);
            merged.push_str(MERGE_SEPARATOR);
            report.merges += 1;

            if next_len <= room {
                merged.push_str(&next);
                total += sep_len + next_len;
                if total == self.target {
                    break;
                }
            } else {
                let (head, tail) = split_at_char(&next, room);
                merged.push_str(head);
                queue.push_front(tail.to_string());
                report.splits += 1;
                break;
            }
        }

        merged
    }
}
