//! Database schema definitions.
//!
//! One table holds every collection. `seq` records first insertion so that
//! full dumps come back in arrival order even after an id is upserted again.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Stored documents with their embeddings
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    document TEXT NOT NULL,
    metadata TEXT,            -- JSON object
    embedding BLOB NOT NULL,  -- f32 array, little endian
    dimensions INTEGER NOT NULL,
    model_name TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (collection, id)
);

-- Index for ordered collection scans
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, seq);
";

/// SQL to check if schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// Idempotent insert: an existing `(collection, id)` keeps its `seq`.
pub const UPSERT_SQL: &str = r"
INSERT INTO documents (collection, id, document, metadata, embedding, dimensions, model_name, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
ON CONFLICT (collection, id) DO UPDATE SET
    document = excluded.document,
    metadata = excluded.metadata,
    embedding = excluded.embedding,
    dimensions = excluded.dimensions,
    model_name = excluded.model_name,
    updated_at = excluded.updated_at;
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version() {
        const _: () = assert!(CURRENT_SCHEMA_VERSION >= 1);
    }

    #[test]
    fn test_schema_sql_not_empty() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE"));
        assert!(SCHEMA_SQL.contains("UNIQUE (collection, id)"));
    }

    #[test]
    fn test_upsert_is_conflict_update() {
        assert!(UPSERT_SQL.contains("ON CONFLICT"));
        assert!(!UPSERT_SQL.contains("seq ="));
    }
}
