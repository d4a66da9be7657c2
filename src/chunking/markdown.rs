//! Chapter-aware markdown segmentation.
//!
//! Headings are lines starting with a run of `#`; the run length is the
//! chapter level. Chapters are kept in a flat, position-ordered list. A
//! chapter's descendants are the contiguous run of following chapters with a
//! strictly greater level, so the hierarchy is recovered with boundary scans
//! instead of stored links.
//!
//! Assembly walks the top-level chapters. A chapter whose full text
//! (descendants included) fits the token budget is emitted whole. An
//! oversized chapter with children recurses into them. An oversized leaf
//! falls back to fixed-size windows.

use crate::chunking::fixed::FixedChunker;
use crate::chunking::traits::Segmenter;
use crate::core::ChunkSequence;
use crate::error::{Error, Result};
use crate::io::unicode::char_len;
use crate::tokens::{chars_to_tokens, tokens_to_chars};
use serde::Serialize;
use std::ops::Range;

/// One markdown chapter, addressed by line indices into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChapterNode {
    /// Heading depth; `1` is top level.
    pub level: usize,
    /// Line index of the heading.
    pub start_line: usize,
    /// End (exclusive) of the chapter's own body: the next heading line.
    pub body_end: usize,
    /// End (exclusive) of the chapter including all nested subchapters.
    pub span_end: usize,
}

/// Flat, position-ordered list of chapters parsed from one document.
#[derive(Debug, Clone)]
pub struct ChapterForest<'a> {
    lines: Vec<&'a str>,
    nodes: Vec<ChapterNode>,
    /// Lines before the first heading.
    preamble_end: usize,
}

impl<'a> ChapterForest<'a> {
    /// Parses chapter headings out of markdown content.
    #[must_use]
    pub fn parse(content: &'a str) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        let headings: Vec<(usize, usize)> = lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| heading_level(line).map(|level| (idx, level)))
            .collect();

        let mut nodes: Vec<ChapterNode> = headings
            .iter()
            .enumerate()
            .map(|(pos, &(start_line, level))| ChapterNode {
                level,
                start_line,
                body_end: headings.get(pos + 1).map_or(lines.len(), |&(next, _)| next),
                span_end: lines.len(),
            })
            .collect();

        for idx in 0..nodes.len() {
            let level = nodes[idx].level;
            if let Some(boundary) = nodes[idx + 1..].iter().find(|n| n.level <= level) {
                nodes[idx].span_end = boundary.start_line;
            }
        }

        let preamble_end = headings.first().map_or(lines.len(), |&(line, _)| line);

        Self {
            lines,
            nodes,
            preamble_end,
        }
    }

    /// All chapters in source order.
    #[must_use]
    pub fn nodes(&self) -> &[ChapterNode] {
        &self.nodes
    }

    /// Number of chapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no heading was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index (exclusive) of the first chapter after `idx`'s subtree.
    #[must_use]
    pub fn subtree_end(&self, idx: usize) -> usize {
        let level = self.nodes[idx].level;
        self.nodes[idx + 1..]
            .iter()
            .position(|n| n.level <= level)
            .map_or(self.nodes.len(), |offset| idx + 1 + offset)
    }

    /// Top-level chapters within a range of chapter indices.
    #[must_use]
    pub fn roots_in(&self, range: Range<usize>) -> Vec<usize> {
        let mut roots = Vec::new();
        let mut idx = range.start;
        while idx < range.end {
            roots.push(idx);
            idx = self.subtree_end(idx);
        }
        roots
    }

    /// Top-level chapters of the whole document.
    #[must_use]
    pub fn roots(&self) -> Vec<usize> {
        self.roots_in(0..self.nodes.len())
    }

    /// Direct children of chapter `idx`.
    #[must_use]
    pub fn children(&self, idx: usize) -> Vec<usize> {
        self.roots_in(idx + 1..self.subtree_end(idx))
    }

    /// Enclosing chapter of `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Contract`] if `idx` is a top-level chapter.
    pub fn parent(&self, idx: usize) -> Result<usize> {
        let node = self.nodes.get(idx).ok_or_else(|| {
            Error::contract(format!("chapter index {idx} out of range ({})", self.len()))
        })?;
        self.nodes[..idx]
            .iter()
            .rposition(|n| n.level < node.level)
            .ok_or_else(|| {
                Error::contract(format!(
                    "heading at line {} (level {}) has no parent chapter",
                    node.start_line + 1,
                    node.level
                ))
            })
    }

    /// Heading plus body plus all nested subchapters.
    #[must_use]
    pub fn full_text(&self, idx: usize) -> String {
        let node = self.nodes[idx];
        self.lines[node.start_line..node.span_end].join("\n")
    }

    /// Heading plus body, up to the next heading of any level.
    #[must_use]
    pub fn own_text(&self, idx: usize) -> String {
        let node = self.nodes[idx];
        self.lines[node.start_line..node.body_end].join("\n")
    }

    /// Text before the first heading, if it holds anything besides whitespace.
    #[must_use]
    pub fn preamble(&self) -> Option<String> {
        let text = self.lines[..self.preamble_end].join("\n");
        (!text.trim().is_empty()).then_some(text)
    }
}

fn heading_level(line: &str) -> Option<usize> {
    let level = line.chars().take_while(|&c| c == '#').count();
    (level > 0).then_some(level)
}

/// Markdown segmenter.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownSegmenter {
    /// Token budget per chunk.
    budget: usize,
    keep_parent_prose: bool,
}

impl MarkdownSegmenter {
    /// Creates a markdown segmenter with a budget of `budget` tokens per chunk.
    ///
    /// Oversized parents keep their own prose as a separate chunk.
    #[must_use]
    pub const fn new(budget: usize) -> Self {
        Self {
            budget,
            keep_parent_prose: true,
        }
    }

    /// Sets whether an oversized parent's own prose is emitted when its
    /// children are segmented separately. When `false` that prose is dropped.
    #[must_use]
    pub const fn with_parent_prose(mut self, keep: bool) -> Self {
        self.keep_parent_prose = keep;
        self
    }

    /// Token budget per chunk.
    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    fn fits(&self, text: &str) -> bool {
        chars_to_tokens(char_len(text)) <= self.budget
    }

    fn assemble(&self, forest: &ChapterForest<'_>, idx: usize, out: &mut ChunkSequence) -> Result<()> {
        let full = forest.full_text(idx);
        if self.fits(&full) {
            out.push(full);
            return Ok(());
        }

        let children = forest.children(idx);
        if children.is_empty() {
            return self.emit_leaf(full, out);
        }

        tracing::debug!(
            line = forest.nodes()[idx].start_line + 1,
            children = children.len(),
            "chapter over budget, descending into subchapters"
        );
        if self.keep_parent_prose {
            self.emit_leaf(forest.own_text(idx), out)?;
        }
        for child in children {
            self.assemble(forest, child, out)?;
        }
        Ok(())
    }

    fn emit_leaf(&self, text: String, out: &mut ChunkSequence) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        if self.fits(&text) {
            out.push(text);
        } else {
            let window = tokens_to_chars(self.budget.max(1));
            out.extend(FixedChunker::with_size(window).segment(&text)?);
        }
        Ok(())
    }
}

impl Segmenter for MarkdownSegmenter {
    fn segment(&self, content: &str) -> Result<ChunkSequence> {
        let forest = ChapterForest::parse(content);
        let mut chunks = ChunkSequence::new();

        if let Some(preamble) = forest.preamble() {
            self.emit_leaf(preamble, &mut chunks)?;
        }
        for root in forest.roots() {
            self.assemble(&forest, root, &mut chunks)?;
        }

        tracing::debug!(
            chapters = forest.len(),
            chunks = chunks.len(),
            "markdown segmented"
        );
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "markdown"
    }

    fn description(&self) -> &'static str {
        "Keeps whole chapters together while they fit the token budget"
    }
}
