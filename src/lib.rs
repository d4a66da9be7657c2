//! # ragline
//!
//! Retrieval-augmented assistant core.
//!
//! ragline shapes content for a language model: it splits input files into
//! token-budgeted chunks, evens out their lengths, filters retrieved results
//! under a token budget and assembles a bounded conversation memory that
//! mixes recent and relevant turns.
//!
//! ## Features
//!
//! - **Segmentation**: plain text (blank line, newline, fixed window, auto),
//!   chapter-aware markdown and PDF page text
//! - **Length normalization**: single-pass merge/split around a target size
//! - **Result filtering**: distance cutoff then token budget, atomic across
//!   parallel result arrays
//! - **Conversation memory**: verbatim ring buffer plus a persisted,
//!   optionally compacted, long-term collection
//! - **`SQLite` vector store**: local collections with cosine-distance query

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod assistant;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod core;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod io;
pub mod llm;
pub mod memory;
pub mod prompt;
pub mod search;
pub mod storage;
pub mod tokens;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{ChunkSequence, MemoryTurn, Message, Metadata, RetrievalResult, Role};

// Re-export pipeline components
pub use assistant::Assistant;
pub use chunking::{
    LengthNormalizer, MarkdownSegmenter, PlainTextSegmenter, SegmentMode, Segmenter, chunk_budget,
};
pub use config::Config;
pub use filter::{ResultFilter, filter_by_distance, filter_by_token_budget};
pub use ingest::{Ingestor, InputType, PreparedDocuments};
pub use memory::{MemoryAssembler, MemorySettings};
pub use prompt::{Answer, OutputType};
pub use search::SearchEngine;

// Re-export storage types
pub use storage::{DEFAULT_DB_PATH, SqliteVectorStore, VectorStore};

// Re-export embedding types
pub use embedding::{DEFAULT_DIMENSIONS, Embedder, HashEmbedder, cosine_similarity};

// Re-export LLM types
pub use llm::{Completer, CompletionRequest, OpenAiCompleter, SamplingParams};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
