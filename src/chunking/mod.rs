//! Document segmentation and chunk-length normalization.
//!
//! Raw documents are split into a [`ChunkSequence`](crate::core::ChunkSequence)
//! by a [`Segmenter`]:
//!
//! - **Plain text**: by blank line, by newline, or fixed-size windows, with an
//!   `auto` mode that picks one from the shape of the content
//! - **Markdown**: chapter-aware assembly that keeps whole chapters together
//!   when they fit the budget
//! - **PDF**: page text joined with newlines, then the plain-text pipeline
//!
//! The [`LengthNormalizer`] then evens out chunk sizes around a target.
//!
//! Sizes are measured in characters. The configured chunk size is converted
//! into a *chunk budget* with [`chunk_budget`]; that budget is the window of
//! fixed-size chunking, the reference for the `auto` long-line test, the
//! token limit for markdown chapters and the normalizer target.

pub mod fixed;
pub mod markdown;
pub mod normalize;
pub mod pdf;
pub mod plain;
pub mod traits;

pub use fixed::FixedChunker;
pub use markdown::{ChapterForest, ChapterNode, MarkdownSegmenter};
pub use normalize::{LengthNormalizer, NormalizeReport};
pub use pdf::pages_to_text;
pub use plain::PlainTextSegmenter;
pub use traits::Segmenter;

use crate::core::ChunkSequence;
use crate::error::{Error, Result};
use crate::tokens::chars_to_tokens;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default configured chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Converts a configured chunk size (characters) into the chunk budget.
#[must_use]
pub const fn chunk_budget(chunk_size: usize) -> usize {
    chars_to_tokens(chunk_size)
}

/// Plain-text segmentation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMode {
    /// Pick a mode from the content shape.
    #[default]
    Auto,
    /// One chunk per non-blank line.
    #[serde(alias = "by_blank")]
    ByBlankLine,
    /// One chunk per line, empty lines included.
    ByNewline,
    /// Fixed-size character windows.
    #[serde(alias = "by_chunk")]
    ByFixedChunk,
}

impl SegmentMode {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ByBlankLine => "by_blank_line",
            Self::ByNewline => "by_newline",
            Self::ByFixedChunk => "by_fixed_chunk",
        }
    }
}

impl fmt::Display for SegmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(Self::Auto),
            "by_blank_line" | "by_blank" | "blank" => Ok(Self::ByBlankLine),
            "by_newline" | "newline" => Ok(Self::ByNewline),
            "by_fixed_chunk" | "by_chunk" | "fixed" => Ok(Self::ByFixedChunk),
            _ => Err(Error::config(format!(
                "unknown segmentation mode: {s} (expected one of: {})",
                available_modes().join(", ")
            ))),
        }
    }
}

/// Lists available segmentation mode names.
#[must_use]
pub fn available_modes() -> Vec<&'static str> {
    vec!["auto", "by_blank_line", "by_newline", "by_fixed_chunk"]
}

/// Segments plain text with `mode` under a chunk budget of `budget` characters.
///
/// # Errors
///
/// Returns an error if `budget` is zero and fixed-size chunking is selected.
pub fn segment(content: &str, mode: SegmentMode, budget: usize) -> Result<ChunkSequence> {
    PlainTextSegmenter::new(mode, budget).segment(content)
}
