//! Input preparation for ingestion.
//!
//! Turns an input file into the documents, ids and metadata written to the
//! `documents` collection. Text, markdown and PDF go through segmentation
//! and (optionally) length normalization. JSON input is an array of flat
//! objects, one document per object, and bypasses both.

use crate::chunking::{
    LengthNormalizer, MarkdownSegmenter, PlainTextSegmenter, SegmentMode, Segmenter, pdf,
};
use crate::core::{ChunkSequence, Metadata};
use crate::error::{Error, Result};
use crate::io::read_file;
use crate::storage::{DOCUMENTS_COLLECTION, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Input file type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Pick from the file extension.
    #[default]
    Auto,
    /// Plain text.
    #[serde(alias = "plain", alias = "text")]
    Txt,
    /// Markdown.
    #[serde(alias = "markdown")]
    Md,
    /// JSON array of objects.
    Json,
    /// PDF document.
    Pdf,
}

impl InputType {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Txt => "txt",
            Self::Md => "md",
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }

    /// Resolves `Auto` from the extension of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the extension is missing or unsupported.
    pub fn resolve(self, path: &Path) -> Result<Self> {
        if self != Self::Auto {
            return Ok(self);
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" | "text" | "log" => Ok(Self::Txt),
            "md" | "markdown" => Ok(Self::Md),
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            _ => Err(Error::config(format!(
                "unsupported file extension \"{ext}\" in {}",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "txt" | "text" | "plain" => Ok(Self::Txt),
            "md" | "markdown" => Ok(Self::Md),
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            _ => Err(Error::config(format!("unknown input type: {s}"))),
        }
    }
}

/// How inputs are segmented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Forced input type, or `Auto`.
    pub input_type: InputType,
    /// Plain-text segmentation mode.
    pub mode: SegmentMode,
    /// Chunk budget (see [`crate::chunking::chunk_budget`]).
    pub chunk_budget: usize,
    /// Whether chunks are normalized to the budget.
    pub enforce_uniform: bool,
    /// Whether oversized markdown parents keep their own prose.
    pub keep_parent_prose: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            input_type: InputType::Auto,
            mode: SegmentMode::Auto,
            chunk_budget: crate::chunking::chunk_budget(crate::chunking::DEFAULT_CHUNK_SIZE),
            enforce_uniform: true,
            keep_parent_prose: true,
        }
    }
}

/// Documents ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocuments {
    /// Source name the ids are derived from.
    pub source: String,
    /// Resolved input type.
    pub input_type: InputType,
    /// Document ids, stable for the same source and position.
    pub ids: Vec<String>,
    /// Document texts.
    pub documents: ChunkSequence,
    /// Per-document metadata.
    pub metadatas: Vec<Metadata>,
}

impl PreparedDocuments {
    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Upserts the documents into the `documents` collection and returns
    /// how many were written.
    ///
    /// Documents left over from an earlier, longer ingestion of the same
    /// source are deleted first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read or write fails.
    pub fn write_to(&self, store: &mut dyn VectorStore) -> Result<usize> {
        let stale: Vec<String> = store
            .get(DOCUMENTS_COLLECTION)?
            .ids
            .into_iter()
            .filter(|id| is_source_id(&self.source, id) && !self.ids.contains(id))
            .collect();
        if !stale.is_empty() {
            let removed = store.delete(DOCUMENTS_COLLECTION, &stale)?;
            tracing::info!(source = %self.source, removed, "removed stale documents");
        }

        if self.is_empty() {
            tracing::warn!("input produced no documents");
            return Ok(0);
        }
        store.upsert(
            DOCUMENTS_COLLECTION,
            &self.ids,
            self.documents.as_slice(),
            Some(self.metadatas.as_slice()),
        )?;
        tracing::info!(
            documents = self.len(),
            input_type = %self.input_type,
            "ingested documents"
        );
        Ok(self.len())
    }
}

/// Prepares input files for the document store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ingestor {
    options: IngestOptions,
}

impl Ingestor {
    /// Creates an ingestor.
    #[must_use]
    pub const fn new(options: IngestOptions) -> Self {
        Self { options }
    }

    /// Ingestion options.
    #[must_use]
    pub const fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Reads and prepares a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unsupported input type or malformed
    /// JSON input, or an I/O error if the file cannot be read.
    pub fn prepare_path<P: AsRef<Path>>(&self, path: P) -> Result<PreparedDocuments> {
        let path = path.as_ref();
        let input_type = self.options.input_type.resolve(path)?;
        let source = source_name(path);

        tracing::info!(path = %path.display(), input_type = %input_type, "preparing input");

        match input_type {
            InputType::Pdf => {
                let pages = pdf::extract_pages(path)?;
                self.prepare_pages(&source, &pages)
            }
            other => self.prepare_text(&source, &read_file(path)?, other),
        }
    }

    /// Prepares already loaded text content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `input_type` is `Auto` or `Pdf`, or if
    /// JSON input is malformed.
    pub fn prepare_text(
        &self,
        source: &str,
        content: &str,
        input_type: InputType,
    ) -> Result<PreparedDocuments> {
        let documents = match input_type {
            InputType::Txt => self.normalized(self.plain_segmenter().segment(content)?)?,
            InputType::Md => self.normalized(self.markdown_segmenter().segment(content)?)?,
            InputType::Json => return json_documents(source, content),
            InputType::Auto | InputType::Pdf => {
                return Err(Error::config(format!(
                    "input type {input_type} needs a file path"
                )));
            }
        };
        Ok(text_documents(source, input_type, documents))
    }

    /// Prepares PDF page texts.
    ///
    /// # Errors
    ///
    /// Returns an error if segmentation fails.
    pub fn prepare_pages<S: AsRef<str>>(
        &self,
        source: &str,
        pages: &[S],
    ) -> Result<PreparedDocuments> {
        let chunks = pdf::segment_pages(pages, &self.plain_segmenter())?;
        Ok(text_documents(source, InputType::Pdf, self.normalized(chunks)?))
    }

    /// Plain-text segmenter for the configured mode and budget.
    #[must_use]
    pub const fn plain_segmenter(&self) -> PlainTextSegmenter {
        PlainTextSegmenter::new(self.options.mode, self.options.chunk_budget)
    }

    /// Markdown segmenter for the configured budget.
    #[must_use]
    pub const fn markdown_segmenter(&self) -> MarkdownSegmenter {
        MarkdownSegmenter::new(self.options.chunk_budget)
            .with_parent_prose(self.options.keep_parent_prose)
    }

    fn normalized(&self, chunks: ChunkSequence) -> Result<ChunkSequence> {
        if !self.options.enforce_uniform || chunks.is_empty() {
            return Ok(chunks);
        }
        Ok(LengthNormalizer::new(self.options.chunk_budget)?.normalize(chunks))
    }
}

fn source_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "input".to_string(), |s| s.to_string_lossy().to_string())
}

fn document_id(source: &str, index: usize) -> String {
    format!("{source}:{}", index + 1)
}

fn is_source_id(source: &str, id: &str) -> bool {
    id.strip_prefix(source)
        .and_then(|rest| rest.strip_prefix(':'))
        .is_some_and(|n| n.parse::<usize>().is_ok())
}

fn text_documents(source: &str, input_type: InputType, documents: ChunkSequence) -> PreparedDocuments {
    let ids = (0..documents.len()).map(|i| document_id(source, i)).collect();
    let metadatas = (0..documents.len())
        .map(|i| {
            let mut meta = Metadata::new();
            meta.insert("source".into(), source.into());
            meta.insert("chunk_index".into(), i.into());
            meta.insert("input_type".into(), input_type.as_str().into());
            meta
        })
        .collect();
    PreparedDocuments {
        source: source.to_string(),
        input_type,
        ids,
        documents,
        metadatas,
    }
}

/// Parses a JSON array of objects with identical key sets. Non-string
/// values are stringified; each object becomes one document (its JSON text)
/// and is also its metadata.
fn json_documents(source: &str, content: &str) -> Result<PreparedDocuments> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| Error::config(format!("invalid JSON input: {e}")))?;
    let Value::Array(items) = value else {
        return Err(Error::config("JSON input must be an array of objects"));
    };

    let mut expected_keys: Option<Vec<String>> = None;
    let mut prepared = PreparedDocuments {
        source: source.to_string(),
        input_type: InputType::Json,
        ids: Vec::with_capacity(items.len()),
        documents: ChunkSequence::new(),
        metadatas: Vec::with_capacity(items.len()),
    };

    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(Error::config(format!(
                "JSON input element {index} is not an object"
            )));
        };

        let keys: Vec<String> = object.keys().cloned().collect();
        match &expected_keys {
            None => expected_keys = Some(keys),
            Some(expected) if *expected != keys => {
                return Err(Error::config(format!(
                    "inconsistent keys in JSON input: element {index} has {keys:?}, expected {expected:?}"
                )));
            }
            Some(_) => {}
        }

        let metadata: Metadata = object
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, Value::String(text))
            })
            .collect();

        let document = serde_json::to_string(&metadata)
            .map_err(|e| Error::config(format!("JSON input element {index}: {e}")))?;
        prepared.ids.push(document_id(source, index));
        prepared.documents.push(document);
        prepared.metadatas.push(metadata);
    }

    tracing::debug!(documents = prepared.len(), "prepared JSON documents");
    Ok(prepared)
}
