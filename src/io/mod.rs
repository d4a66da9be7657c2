//! I/O utilities for ragline.
//!
//! File reading with memory mapping for large inputs, plus character-offset
//! helpers used wherever chunk text is split.

pub mod reader;
pub mod unicode;

pub use reader::{FileReader, read_file};
pub use unicode::{byte_offset, char_len, split_at_char, tail_chars, validate_utf8};
