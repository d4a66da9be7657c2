//! Retrieval results.
//!
//! A [`RetrievalResult`] holds the ranked hits for one query text as four
//! parallel sequences: documents, distances, ids and metadata. The fields are
//! private so the only way to drop hits is [`RetrievalResult::retain_indices`],
//! which applies the same selection to every sequence.

use crate::error::{ChunkingError, Result};
use serde::{Deserialize, Serialize};

/// Metadata attached to a stored document.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Hits for a single query, ordered by rank (closest first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRetrievalResult")]
pub struct RetrievalResult {
    documents: Vec<String>,
    distances: Vec<f32>,
    ids: Vec<String>,
    metadatas: Vec<Option<Metadata>>,
}

/// Wire form, checked through [`RetrievalResult::new`] on deserialization.
#[derive(Deserialize)]
struct RawRetrievalResult {
    documents: Vec<String>,
    distances: Vec<f32>,
    ids: Vec<String>,
    metadatas: Vec<Option<Metadata>>,
}

impl TryFrom<RawRetrievalResult> for RetrievalResult {
    type Error = crate::error::Error;

    fn try_from(raw: RawRetrievalResult) -> Result<Self> {
        Self::new(raw.documents, raw.distances, raw.ids, raw.metadatas)
    }
}

impl RetrievalResult {
    /// Builds a result from parallel sequences.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::Misaligned`] if the sequences differ in length.
    pub fn new(
        documents: Vec<String>,
        distances: Vec<f32>,
        ids: Vec<String>,
        metadatas: Vec<Option<Metadata>>,
    ) -> Result<Self> {
        let len = documents.len();
        if distances.len() != len || ids.len() != len || metadatas.len() != len {
            return Err(ChunkingError::Misaligned {
                documents: len,
                distances: distances.len(),
                ids: ids.len(),
                metadatas: metadatas.len(),
            }
            .into());
        }
        Ok(Self {
            documents,
            distances,
            ids,
            metadatas,
        })
    }

    /// Creates an empty result.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            documents: Vec::new(),
            distances: Vec::new(),
            ids: Vec::new(),
            metadatas: Vec::new(),
        }
    }

    /// Appends one hit to all four sequences.
    pub fn push(
        &mut self,
        document: String,
        distance: f32,
        id: String,
        metadata: Option<Metadata>,
    ) {
        self.documents.push(document);
        self.distances.push(distance);
        self.ids.push(id);
        self.metadatas.push(metadata);
    }

    /// Number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether there are no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Retrieved documents.
    #[must_use]
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Similarity distances (lower is closer).
    #[must_use]
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Document ids.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Document metadata.
    #[must_use]
    pub fn metadatas(&self) -> &[Option<Metadata>] {
        &self.metadatas
    }

    /// Keeps only the hits at `keep` (ascending, deduplicated positions),
    /// materializing a new set of parallel sequences.
    #[must_use]
    pub fn retain_indices(self, keep: &[usize]) -> Self {
        let mut kept = Self::empty();
        let mut documents = self.documents.into_iter().map(Some).collect::<Vec<_>>();
        let mut ids = self.ids.into_iter().map(Some).collect::<Vec<_>>();
        let mut metadatas = self.metadatas.into_iter().map(Some).collect::<Vec<_>>();

        for &i in keep {
            if let (Some(document), Some(&distance), Some(id), Some(metadata)) = (
                documents.get_mut(i).and_then(Option::take),
                self.distances.get(i),
                ids.get_mut(i).and_then(Option::take),
                metadatas.get_mut(i).and_then(Option::take),
            ) {
                kept.push(document, distance, id, metadata);
            }
        }
        kept
    }

    /// Keeps the first `len` hits.
    #[must_use]
    pub fn truncated(mut self, len: usize) -> Self {
        self.documents.truncate(len);
        self.distances.truncate(len);
        self.ids.truncate(len);
        self.metadatas.truncate(len);
        self
    }

    /// Iterates hits as `(document, distance, id, metadata)` tuples.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32, &str, Option<&Metadata>)> {
        self.documents
            .iter()
            .zip(&self.distances)
            .zip(&self.ids)
            .zip(&self.metadatas)
            .map(|(((doc, &dist), id), meta)| (doc.as_str(), dist, id.as_str(), meta.as_ref()))
    }
}
