//! Segmenter trait definition.
//!
//! Defines the interface shared by every document segmentation strategy.

use crate::core::ChunkSequence;
use crate::error::Result;

/// Splits raw document content into an ordered [`ChunkSequence`].
///
/// Implementations must be deterministic: the same input always yields the
/// same chunks.
///
/// # Examples
///
/// ```
/// use ragline::chunking::{PlainTextSegmenter, SegmentMode, Segmenter};
///
/// let segmenter = PlainTextSegmenter::new(SegmentMode::ByBlankLine, 128);
/// let chunks = segmenter.segment("a\n\nb\nc\n\nd").unwrap();
/// assert_eq!(chunks, ["a", "b", "c", "d"]);
/// ```
pub trait Segmenter: Send + Sync {
    /// Segments `content` into chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the segmenter is misconfigured (e.g. a zero
    /// chunk budget).
    fn segment(&self, content: &str) -> Result<ChunkSequence>;

    /// Returns the name of the segmentation strategy.
    fn name(&self) -> &'static str;

    /// Returns a description of the segmentation strategy.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
