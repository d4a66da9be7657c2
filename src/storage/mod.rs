//! Storage layer for ragline.
//!
//! Ingested chunks and persisted conversation turns live in named
//! collections of a [`VectorStore`]. The bundled implementation keeps them
//! in `SQLite` together with their embeddings.

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use schema::CURRENT_SCHEMA_VERSION;
pub use sqlite::SqliteVectorStore;
pub use traits::{DOCUMENTS_COLLECTION, MEMORY_COLLECTION, StoreStats, StoredDocuments, VectorStore};

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".ragline/ragline.db";
