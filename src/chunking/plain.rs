//! Plain-text segmentation.
//!
//! `auto` mode decides in this order:
//!
//! 1. content has a blank line: paragraphs, split by blank line
//! 2. some line is at least twice the budget long: fixed-size windows
//! 3. otherwise: one chunk per line

use crate::chunking::SegmentMode;
use crate::chunking::fixed::FixedChunker;
use crate::chunking::traits::Segmenter;
use crate::core::ChunkSequence;
use crate::error::Result;
use crate::io::unicode::char_len;

/// Plain-text segmenter.
#[derive(Debug, Clone, Copy)]
pub struct PlainTextSegmenter {
    mode: SegmentMode,
    /// Chunk budget in characters.
    budget: usize,
}

impl PlainTextSegmenter {
    /// Creates a segmenter for `mode` with a chunk budget of `budget` characters.
    #[must_use]
    pub const fn new(mode: SegmentMode, budget: usize) -> Self {
        Self { mode, budget }
    }

    /// The configured mode (may be `Auto`).
    #[must_use]
    pub const fn mode(&self) -> SegmentMode {
        self.mode
    }

    /// Resolves `Auto` against `content`; other modes are returned as is.
    #[must_use]
    pub fn resolve_mode(&self, content: &str) -> SegmentMode {
        match self.mode {
            SegmentMode::Auto => {
                if contains_blank_lines(content) {
                    SegmentMode::ByBlankLine
                } else if contains_long_lines(content, self.budget) {
                    SegmentMode::ByFixedChunk
                } else {
                    SegmentMode::ByNewline
                }
            }
            mode => mode,
        }
    }
}

impl Segmenter for PlainTextSegmenter {
    fn segment(&self, content: &str) -> Result<ChunkSequence> {
        if content.is_empty() {
            return Ok(ChunkSequence::new());
        }

        let mode = self.resolve_mode(content);
        tracing::debug!(requested = %self.mode, resolved = %mode, "segmenting plain text");

        let chunks = match mode {
            SegmentMode::ByBlankLine => by_blank_line(content),
            SegmentMode::ByNewline => by_newline(content),
            SegmentMode::ByFixedChunk | SegmentMode::Auto => {
                FixedChunker::with_size(self.budget).segment(content)?
            }
        };

        tracing::debug!(mode = %mode, chunks = chunks.len(), "plain text segmented");
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        self.mode.as_str()
    }

    fn description(&self) -> &'static str {
        match self.mode {
            SegmentMode::Auto => "Chooses blank-line, newline or fixed-size splitting from content shape",
            SegmentMode::ByBlankLine => "One chunk per non-blank line",
            SegmentMode::ByNewline => "One chunk per line, empty lines kept",
            SegmentMode::ByFixedChunk => "Fixed-size character windows without overlap",
        }
    }
}

fn contains_blank_lines(content: &str) -> bool {
    content.lines().any(|line| line.trim().is_empty())
}

fn contains_long_lines(content: &str, budget: usize) -> bool {
    content
        .lines()
        .any(|line| char_len(line) >= budget.saturating_mul(2))
}

fn by_blank_line(content: &str) -> ChunkSequence {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn by_newline(content: &str) -> ChunkSequence {
    content.split('\n').map(str::to_string).collect()
}
