//! Core domain models for ragline.
//!
//! Chunk sequences, retrieval results and conversation turns. These are pure
//! data structures with no I/O dependencies.

pub mod chunk;
pub mod retrieval;
pub mod turn;

pub use chunk::ChunkSequence;
pub use retrieval::{Metadata, RetrievalResult};
pub use turn::{MemoryTurn, Message, Role};
