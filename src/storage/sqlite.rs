//! `SQLite` vector store implementation.
//!
//! Documents, metadata and embeddings live in a single table keyed by
//! `(collection, id)`. Queries embed the query text and rank every document
//! of the collection by cosine distance; collections are expected to stay
//! small enough for a linear scan.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative values that fit in usize.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::core::{Metadata, RetrievalResult};
use crate::embedding::{Embedder, cosine_distance, create_embedder};
use crate::error::{Result, StorageError};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
    UPSERT_SQL,
};
use crate::storage::traits::{StoreStats, StoredDocuments, VectorStore};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

/// SQLite-backed [`VectorStore`].
///
/// # Examples
///
/// ```no_run
/// use ragline::storage::{SqliteVectorStore, VectorStore};
///
/// let mut store = SqliteVectorStore::open(".ragline/ragline.db").unwrap();
/// store.init().unwrap();
/// ```
pub struct SqliteVectorStore {
    /// `SQLite` connection.
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
    embedder: Box<dyn Embedder>,
}

/// One row loaded for ranking.
struct ScoredRow {
    id: String,
    document: String,
    metadata: Option<Metadata>,
    embedding: Vec<f32>,
}

impl SqliteVectorStore {
    /// Opens or creates a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Database(e.to_string()))?;
            }
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;

        Ok(Self {
            conn,
            path: Some(path),
            embedder: create_embedder(),
        })
    }

    /// Creates an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Ok(Self {
            conn,
            path: None,
            embedder: create_embedder(),
        })
    }

    /// Replaces the embedder used for writes and queries.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<String> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;

        Ok(version.and_then(|v| v.parse().ok()))
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute(SET_VERSION_SQL, params![version.to_string()])
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized()? {
            Ok(())
        } else {
            Err(StorageError::NotInitialized.into())
        }
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    fn decode_metadata(raw: Option<String>) -> Result<Option<Metadata>> {
        raw.map(|json| serde_json::from_str(&json).map_err(StorageError::from))
            .transpose()
            .map_err(Into::into)
    }

    fn load_rows(&self, collection: &str) -> Result<Vec<ScoredRow>> {
        let mut stmt = self
            .conn
            .prepare(
                r"
                SELECT id, document, metadata, embedding
                FROM documents
                WHERE collection = ?
                ORDER BY seq
            ",
            )
            .map_err(StorageError::from)?;

        let raw = stmt
            .query_map(params![collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        raw.into_iter()
            .map(|(id, document, metadata, blob)| {
                Ok(ScoredRow {
                    id,
                    document,
                    metadata: Self::decode_metadata(metadata)?,
                    embedding: Self::decode_embedding(&blob),
                })
            })
            .collect()
    }
}

impl VectorStore for SqliteVectorStore {
    fn init(&mut self) -> Result<()> {
        let is_init: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;

        if is_init == 0 {
            self.conn
                .execute_batch(SCHEMA_SQL)
                .map_err(StorageError::from)?;
            self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        } else if let Some(current) = self.get_schema_version()? {
            if current > CURRENT_SCHEMA_VERSION {
                return Err(StorageError::Migration(format!(
                    "database schema v{current} is newer than supported v{CURRENT_SCHEMA_VERSION}"
                ))
                .into());
            }
        }

        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count > 0)
    }

    fn upsert(
        &mut self,
        collection: &str,
        ids: &[String],
        documents: &[String],
        metadatas: Option<&[Metadata]>,
    ) -> Result<()> {
        let metadata_len = metadatas.map_or(ids.len(), <[Metadata]>::len);
        if ids.len() != documents.len() || metadata_len != ids.len() {
            return Err(StorageError::LengthMismatch {
                ids: ids.len(),
                documents: documents.len(),
                metadatas: metadatas.map_or(0, <[Metadata]>::len),
            }
            .into());
        }
        self.ensure_initialized()?;
        if ids.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = documents.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        let model_name = self.embedder.model_name().to_string();
        let now = Self::now();

        let tx = self.conn.transaction().map_err(StorageError::from)?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL).map_err(StorageError::from)?;
            for (idx, (id, document)) in ids.iter().zip(documents).enumerate() {
                let metadata = metadatas
                    .map(|m| serde_json::to_string(&m[idx]))
                    .transpose()
                    .map_err(StorageError::from)?;
                let embedding = &embeddings[idx];

                stmt.execute(params![
                    collection,
                    id,
                    document,
                    metadata,
                    Self::encode_embedding(embedding),
                    embedding.len() as i64,
                    model_name,
                    now
                ])
                .map_err(StorageError::from)?;
            }
        }
        tx.commit().map_err(StorageError::from)?;

        tracing::debug!(collection, count = ids.len(), "upserted documents");
        Ok(())
    }

    fn query(
        &self,
        collection: &str,
        query_texts: &[&str],
        n_results: usize,
    ) -> Result<Vec<RetrievalResult>> {
        self.ensure_initialized()?;
        let rows = self.load_rows(collection)?;
        let query_embeddings = self.embedder.embed_batch(query_texts)?;

        let results = query_embeddings
            .iter()
            .map(|query| {
                let mut ranked: Vec<(f32, &ScoredRow)> = rows
                    .iter()
                    .map(|row| (cosine_distance(query, &row.embedding), row))
                    .collect();
                ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut result = RetrievalResult::empty();
                for (distance, row) in ranked.into_iter().take(n_results) {
                    result.push(
                        row.document.clone(),
                        distance,
                        row.id.clone(),
                        row.metadata.clone(),
                    );
                }
                result
            })
            .collect();

        tracing::debug!(
            collection,
            queries = query_texts.len(),
            candidates = rows.len(),
            n_results,
            "queried vector store"
        );
        Ok(results)
    }

    fn get(&self, collection: &str) -> Result<StoredDocuments> {
        self.ensure_initialized()?;
        let mut dump = StoredDocuments::default();
        for row in self.load_rows(collection)? {
            dump.ids.push(row.id);
            dump.documents.push(row.document);
            dump.metadatas.push(row.metadata);
        }
        Ok(dump)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        self.ensure_initialized()?;
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?",
                params![collection],
                |row| row.get(0),
            )
            .map_err(StorageError::from)?;
        Ok(count as usize)
    }

    fn delete(&mut self, collection: &str, ids: &[String]) -> Result<usize> {
        self.ensure_initialized()?;
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction().map_err(StorageError::from)?;
        let mut deleted = 0;
        {
            let mut stmt = tx
                .prepare("DELETE FROM documents WHERE collection = ? AND id = ?")
                .map_err(StorageError::from)?;
            for id in ids {
                deleted += stmt
                    .execute(params![collection, id])
                    .map_err(StorageError::from)?;
            }
        }
        tx.commit().map_err(StorageError::from)?;

        tracing::debug!(collection, deleted, "deleted documents");
        Ok(deleted)
    }

    fn reset(&mut self, collection: Option<&str>) -> Result<()> {
        self.ensure_initialized()?;
        match collection {
            Some(name) => self
                .conn
                .execute("DELETE FROM documents WHERE collection = ?", params![name])
                .map_err(StorageError::from)?,
            None => self
                .conn
                .execute("DELETE FROM documents", [])
                .map_err(StorageError::from)?,
        };
        tracing::info!(collection = collection.unwrap_or("*"), "store reset");
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        self.ensure_initialized()?;
        let mut stmt = self
            .conn
            .prepare("SELECT collection, COUNT(*) FROM documents GROUP BY collection")
            .map_err(StorageError::from)?;
        let collections: std::collections::BTreeMap<String, usize> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<_, _>>()
            .map_err(StorageError::from)?;

        let schema_version = self.get_schema_version()?.unwrap_or(0);

        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok().map(|m| m.len()));

        Ok(StoreStats {
            collections,
            schema_version,
            model_name: self.embedder.model_name().to_string(),
            db_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::traits::{DOCUMENTS_COLLECTION, MEMORY_COLLECTION};

    fn setup() -> SqliteVectorStore {
        let mut store = SqliteVectorStore::in_memory().unwrap();
        store.init().unwrap();
        store
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_init() {
        let mut store = SqliteVectorStore::in_memory().unwrap();
        assert!(!store.is_initialized().unwrap());
        assert!(store.init().is_ok());
        assert!(store.is_initialized().unwrap());
    }

    #[test]
    fn test_init_idempotent() {
        let mut store = SqliteVectorStore::in_memory().unwrap();
        assert!(store.init().is_ok());
        assert!(store.init().is_ok());
    }

    #[test]
    fn test_uninitialized_store_rejects_reads() {
        let store = SqliteVectorStore::in_memory().unwrap();
        assert!(matches!(
            store.count(DOCUMENTS_COLLECTION),
            Err(Error::Storage(StorageError::NotInitialized))
        ));
    }

    #[test]
    fn test_upsert_and_get_in_insertion_order() {
        let mut store = setup();
        store
            .upsert(
                DOCUMENTS_COLLECTION,
                &strings(&["b", "a", "c"]),
                &strings(&["second doc", "first doc", "third doc"]),
                None,
            )
            .unwrap();

        let dump = store.get(DOCUMENTS_COLLECTION).unwrap();
        assert_eq!(dump.ids, ["b", "a", "c"]);
        assert_eq!(dump.documents[0], "second doc");
        assert!(dump.metadatas.iter().all(Option::is_none));
    }

    #[test]
    fn test_upsert_is_idempotent_by_id() {
        let mut store = setup();
        let ids = strings(&["x", "y"]);
        store
            .upsert(DOCUMENTS_COLLECTION, &ids, &strings(&["old x", "y"]), None)
            .unwrap();
        store
            .upsert(DOCUMENTS_COLLECTION, &strings(&["x"]), &strings(&["new x"]), None)
            .unwrap();

        let dump = store.get(DOCUMENTS_COLLECTION).unwrap();
        assert_eq!(dump.ids, ["x", "y"]);
        assert_eq!(dump.documents, ["new x", "y"]);
        assert_eq!(store.count(DOCUMENTS_COLLECTION).unwrap(), 2);
    }

    #[test]
    fn test_upsert_length_mismatch() {
        let mut store = setup();
        let err = store
            .upsert(DOCUMENTS_COLLECTION, &strings(&["a"]), &strings(&["1", "2"]), None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::LengthMismatch {
                ids: 1,
                documents: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut store = setup();
        let mut meta = Metadata::new();
        meta.insert("role".into(), "user".into());
        meta.insert("turn_id".into(), 3.into());

        store
            .upsert(
                MEMORY_COLLECTION,
                &strings(&["t3-user"]),
                &strings(&["hello"]),
                Some(std::slice::from_ref(&meta)),
            )
            .unwrap();

        let dump = store.get(MEMORY_COLLECTION).unwrap();
        assert_eq!(dump.metadatas[0].as_ref(), Some(&meta));
    }

    #[test]
    fn test_query_ranks_closest_first() {
        let mut store = setup();
        store
            .upsert(
                DOCUMENTS_COLLECTION,
                &strings(&["rust", "paris", "cats"]),
                &strings(&[
                    "rust ownership and borrowing rules",
                    "paris is the capital of france",
                    "cats sleep most of the day",
                ]),
                None,
            )
            .unwrap();

        let results = store
            .query(
                DOCUMENTS_COLLECTION,
                &["what is the capital of france", "borrowing in rust"],
                2,
            )
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].ids()[0], "paris");
        assert_eq!(results[1].ids()[0], "rust");
        assert!(results.iter().all(|r| r.len() == 2));
        assert!(results[0].distances()[0] <= results[0].distances()[1]);
    }

    #[test]
    fn test_collections_are_isolated() {
        let mut store = setup();
        store
            .upsert(DOCUMENTS_COLLECTION, &strings(&["d"]), &strings(&["doc"]), None)
            .unwrap();
        store
            .upsert(MEMORY_COLLECTION, &strings(&["m"]), &strings(&["mem"]), None)
            .unwrap();

        assert_eq!(store.count(DOCUMENTS_COLLECTION).unwrap(), 1);
        let hits = store.query(MEMORY_COLLECTION, &["doc"], 10).unwrap();
        assert_eq!(hits[0].ids(), ["m"]);
    }

    #[test]
    fn test_delete_by_id() {
        let mut store = setup();
        store
            .upsert(DOCUMENTS_COLLECTION, &strings(&["a", "b", "c"]), &strings(&["1", "2", "3"]), None)
            .unwrap();
        store
            .upsert(MEMORY_COLLECTION, &strings(&["b"]), &strings(&["mem"]), None)
            .unwrap();

        let deleted = store
            .delete(DOCUMENTS_COLLECTION, &strings(&["b", "missing"]))
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.get(DOCUMENTS_COLLECTION).unwrap().ids, ["a", "c"]);
        assert_eq!(store.count(MEMORY_COLLECTION).unwrap(), 1);
        assert_eq!(store.delete(DOCUMENTS_COLLECTION, &[]).unwrap(), 0);
    }

    #[test]
    fn test_reset_single_and_all() {
        let mut store = setup();
        store
            .upsert(DOCUMENTS_COLLECTION, &strings(&["d"]), &strings(&["doc"]), None)
            .unwrap();
        store
            .upsert(MEMORY_COLLECTION, &strings(&["m"]), &strings(&["mem"]), None)
            .unwrap();

        store.reset(Some(MEMORY_COLLECTION)).unwrap();
        assert_eq!(store.count(MEMORY_COLLECTION).unwrap(), 0);
        assert_eq!(store.count(DOCUMENTS_COLLECTION).unwrap(), 1);

        store.reset(None).unwrap();
        assert_eq!(store.count(DOCUMENTS_COLLECTION).unwrap(), 0);
    }

    #[test]
    fn test_stats() {
        let mut store = setup();
        assert_eq!(store.stats().unwrap().total_documents(), 0);

        store
            .upsert(DOCUMENTS_COLLECTION, &strings(&["a", "b"]), &strings(&["1", "2"]), None)
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.collections.get(DOCUMENTS_COLLECTION), Some(&2));
        assert_eq!(stats.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(stats.db_size.is_none());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");
        {
            let mut store = SqliteVectorStore::open(&path).unwrap();
            store.init().unwrap();
            store
                .upsert(DOCUMENTS_COLLECTION, &strings(&["a"]), &strings(&["kept"]), None)
                .unwrap();
        }
        let store = SqliteVectorStore::open(&path).unwrap();
        assert_eq!(store.get(DOCUMENTS_COLLECTION).unwrap().documents, ["kept"]);
        assert!(store.stats().unwrap().db_size.is_some());
    }
}
