//! Vector store trait definition.
//!
//! The interface the pipeline consumes from a document store: idempotent
//! upsert, similarity query grouped per query text, and a full ordered dump.

use crate::core::{Metadata, RetrievalResult};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Collection holding ingested document chunks.
pub const DOCUMENTS_COLLECTION: &str = "documents";

/// Collection holding persisted conversation turns.
pub const MEMORY_COLLECTION: &str = "memory";

/// Full dump of a collection in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoredDocuments {
    /// Document texts.
    pub documents: Vec<String>,
    /// Document ids.
    pub ids: Vec<String>,
    /// Document metadata.
    pub metadatas: Vec<Option<Metadata>>,
}

impl StoredDocuments {
    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Persistent document store with similarity search.
///
/// Collections are addressed by name and created on first write.
pub trait VectorStore: Send {
    /// Initializes storage (creates schema). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    fn init(&mut self) -> Result<()>;

    /// Checks if storage is initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn is_initialized(&self) -> Result<bool>;

    /// Inserts or replaces documents by id.
    ///
    /// Re-upserting an id replaces its text, metadata and embedding but keeps
    /// its original position in [`VectorStore::get`] order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LengthMismatch`](crate::error::StorageError::LengthMismatch)
    /// if `ids`, `documents` and `metadatas` differ in length, or an error if
    /// embedding or the database write fails.
    fn upsert(
        &mut self,
        collection: &str,
        ids: &[String],
        documents: &[String],
        metadatas: Option<&[Metadata]>,
    ) -> Result<()>;

    /// Returns up to `n_results` closest documents for each query text.
    ///
    /// The outer vector is indexed by query, each inner result by rank.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the database read fails.
    fn query(
        &self,
        collection: &str,
        query_texts: &[&str],
        n_results: usize,
    ) -> Result<Vec<RetrievalResult>>;

    /// Returns every document of a collection in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    fn get(&self, collection: &str) -> Result<StoredDocuments>;

    /// Number of documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    fn count(&self, collection: &str) -> Result<usize>;

    /// Deletes documents by id and returns how many existed.
    ///
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn delete(&mut self, collection: &str, ids: &[String]) -> Result<usize>;

    /// Deletes every document of `collection`, or of all collections.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn reset(&mut self, collection: Option<&str>) -> Result<()>;

    /// Gets storage statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    fn stats(&self) -> Result<StoreStats>;
}

/// Storage statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Document count per collection.
    pub collections: BTreeMap<String, usize>,
    /// Schema version.
    pub schema_version: u32,
    /// Embedding model recorded for new writes.
    pub model_name: String,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
}

impl StoreStats {
    /// Total documents across collections.
    #[must_use]
    pub fn total_documents(&self) -> usize {
        self.collections.values().sum()
    }
}
