//! Error types for ragline operations.
//!
//! This module provides the error hierarchy using `thiserror` for the
//! content-shaping pipeline, the local vector store, file I/O, the LLM
//! client and CLI commands.
//!
//! Two variants are fatal by contract rather than by circumstance:
//! [`Error::Config`] (unknown mode, unknown input type, missing schema) and
//! [`Error::Contract`] (a caller broke an API precondition). Budget overshoot
//! is never an error.

use thiserror::Error;

/// Result type alias for ragline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Vector store errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Segmentation and normalization errors.
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Completion endpoint errors.
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// A caller violated an API precondition.
    #[error("contract violation: {message}")]
    Contract {
        /// Description of the violated contract.
        message: String,
    },
}

impl Error {
    /// Builds a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Builds a contract violation.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }
}

/// Storage-specific errors for the vector store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Storage not initialized (init command not run).
    #[error("store not initialized. Run: ragline init")]
    NotInitialized,

    /// Upsert arguments were not parallel.
    #[error("upsert length mismatch: {ids} ids, {documents} documents, {metadatas} metadatas")]
    LengthMismatch {
        /// Number of ids.
        ids: usize,
        /// Number of documents.
        documents: usize,
        /// Number of metadata entries.
        metadatas: usize,
    },

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Embedding generation error.
    #[error("embedding error: {0}")]
    Embedding(String),
}

/// Segmentation errors.
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Invalid chunk configuration.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// Retrieval arrays were not parallel.
    #[error("misaligned retrieval result: {documents} documents, {distances} distances, {ids} ids, {metadatas} metadatas")]
    Misaligned {
        /// Number of documents.
        documents: usize,
        /// Number of distances.
        distances: usize,
        /// Number of ids.
        ids: usize,
        /// Number of metadata entries.
        metadatas: usize,
    },

    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(String),
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// Completion endpoint errors. Propagated unmodified, never retried.
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key available.
    #[error("missing API key (set OPENAI_API_KEY)")]
    MissingApiKey,

    /// Transport failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status.
    #[error("endpoint returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated by the caller).
        body: String,
    },

    /// Response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Request body could not be encoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// Output format error.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<regex::Error> for ChunkingError {
    fn from(err: regex::Error) -> Self {
        Self::Regex(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<ureq::Error> for LlmError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                Self::Status {
                    status,
                    body: body.chars().take(500).collect(),
                }
            }
            ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::contract("compaction expects 2 lines, got 3");
        assert_eq!(
            err.to_string(),
            "contract violation: compaction expects 2 lines, got 3"
        );
    }

    #[test]
    fn test_error_config() {
        let err = Error::config("unknown segmentation mode: by_word");
        assert_eq!(
            err.to_string(),
            "configuration error: unknown segmentation mode: by_word"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NotInitialized;
        assert_eq!(err.to_string(), "store not initialized. Run: ragline init");

        let err = StorageError::LengthMismatch {
            ids: 2,
            documents: 3,
            metadatas: 0,
        };
        assert!(err.to_string().contains("2 ids"));
        assert!(err.to_string().contains("3 documents"));
    }

    #[test]
    fn test_chunking_error_display() {
        let err = ChunkingError::InvalidConfig {
            reason: "chunk_size must be > 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid chunk configuration: chunk_size must be > 0"
        );

        let err = ChunkingError::Misaligned {
            documents: 1,
            distances: 2,
            ids: 1,
            metadatas: 1,
        };
        assert!(err.to_string().contains("2 distances"));
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Status {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "endpoint returned status 429: rate limited");
        assert!(LlmError::MissingApiKey.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_io_error_display() {
        let err = IoError::FileNotFound {
            path: "/tmp/test.txt".to_string(),
        };
        assert_eq!(err.to_string(), "file not found: /tmp/test.txt");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_llm() {
        let err: Error = LlmError::Transport("connection reset".to_string()).into();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[test]
    fn test_from_rusqlite_error_to_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }

    #[test]
    #[allow(clippy::invalid_regex)]
    fn test_from_regex_error_to_chunking_error() {
        let regex_err = regex::Regex::new("[invalid").unwrap_err();
        let err: ChunkingError = regex_err.into();
        assert!(matches!(err, ChunkingError::Regex(_)));
    }

    #[test]
    fn test_from_serde_json_error_to_storage_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_from_serde_json_error_to_llm_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: Error = LlmError::from(json_err).into();
        assert!(matches!(err, Error::Llm(LlmError::InvalidRequest(_))));
        assert!(err.to_string().contains("invalid request"));
    }

    #[test]
    fn test_from_toml_error_is_config() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: Error = toml_err.into();
        assert!(matches!(err, Error::Config { .. }));
    }
}
