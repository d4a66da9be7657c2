//! Embedding generation for the local vector store.
//!
//! Documents and queries are turned into fixed-length vectors by an
//! [`Embedder`]. The bundled [`HashEmbedder`] is deterministic and lexical:
//! texts sharing words and word fragments land close together. Distances
//! reported by the store are cosine distances over these vectors.

mod hash;

pub use hash::HashEmbedder;

use crate::Result;

/// Default embedding dimensions.
pub const DEFAULT_DIMENSIONS: usize = 256;

/// Produces embedding vectors for texts.
///
/// Implementations must be deterministic: vectors are persisted, and a query
/// embedded later must be comparable with documents embedded earlier.
///
/// # Examples
///
/// ```
/// use ragline::embedding::{Embedder, HashEmbedder, DEFAULT_DIMENSIONS};
///
/// let embedder = HashEmbedder::new(DEFAULT_DIMENSIONS);
/// let embedding = embedder.embed("Hello, world!").unwrap();
/// assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);
/// ```
pub trait Embedder: Send + Sync {
    /// Identifier recorded alongside stored vectors.
    fn model_name(&self) -> &str;

    /// Vector length.
    fn dimensions(&self) -> usize;

    /// Embeds one text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds many texts, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails for any text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Creates the default embedder.
#[must_use]
pub fn create_embedder() -> Box<dyn Embedder> {
    Box::new(HashEmbedder::new(DEFAULT_DIMENSIONS))
}

/// Cosine similarity in `[-1, 1]`; `0.0` for mismatched lengths or zero vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Cosine distance, `1 - cosine_similarity`, in `[0, 2]`. Lower is closer.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatch_and_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_range() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_default_embedder_batch() {
        let embedder = create_embedder();
        let embeddings = embedder.embed_batch(&["hello", "world", "test"]).unwrap();
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings.iter().all(|e| e.len() == DEFAULT_DIMENSIONS));
        assert!(embedder.embed_batch(&[]).unwrap().is_empty());
    }
}
