//! Feature-hashing embedder.
//!
//! Each lowercased word, adjacent word pair and in-word character trigram is
//! hashed with FNV-1a into one of `dimensions` buckets with a signed weight.
//! The vector is scaled to unit length. FNV is fixed across platforms and
//! toolchains, so vectors written to disk stay comparable with new queries.

use crate::Result;
use crate::embedding::Embedder;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const WORD_WEIGHT: f32 = 1.0;
const PAIR_WEIGHT: f32 = 0.5;
const TRIGRAM_WEIGHT: f32 = 0.35;

/// Deterministic lexical embedder.
///
/// # Examples
///
/// ```
/// use ragline::embedding::{Embedder, HashEmbedder};
///
/// let embedder = HashEmbedder::new(64);
/// assert_eq!(embedder.embed("hello world").unwrap(), embedder.embed("hello world").unwrap());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing `dimensions`-long vectors (at least 1).
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions: if dimensions == 0 { 1 } else { dimensions },
        }
    }

    fn fnv1a(parts: &[&str]) -> u64 {
        let mut hash = FNV_OFFSET;
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hash ^= 0x1f;
                hash = hash.wrapping_mul(FNV_PRIME);
            }
            for byte in part.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        hash
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add(&self, embedding: &mut [f32], parts: &[&str], weight: f32) {
        let hash = Self::fnv1a(parts);
        let idx = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        embedding[idx] += sign * weight;
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        for word in &words {
            self.add(&mut embedding, &[word], WORD_WEIGHT);

            let chars: Vec<(usize, char)> = word.char_indices().collect();
            if chars.len() > 3 {
                for start in 0..=chars.len() - 3 {
                    let from = chars[start].0;
                    let to = chars.get(start + 3).map_or(word.len(), |&(pos, _)| pos);
                    self.add(&mut embedding, &["#", &word[from..to]], TRIGRAM_WEIGHT);
                }
            }
        }
        for pair in words.windows(2) {
            self.add(&mut embedding, pair, PAIR_WEIGHT);
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }
        embedding
    }
}

impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "fnv-hash-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        use rayon::prelude::*;

        Ok(texts.par_iter().map(|text| self.generate(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{DEFAULT_DIMENSIONS, cosine_similarity};

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::new(DEFAULT_DIMENSIONS);
        assert_eq!(
            embedder.embed("hello world").unwrap(),
            embedder.embed("hello world").unwrap()
        );
    }

    #[test]
    fn test_fnv_is_stable() {
        // Reference FNV-1a value for "a".
        assert_eq!(HashEmbedder::fnv1a(&["a"]), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_unit_length() {
        let emb = HashEmbedder::new(DEFAULT_DIMENSIONS)
            .embed("The quick brown fox")
            .unwrap();
        let magnitude: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashEmbedder::new(DEFAULT_DIMENSIONS);
        assert_eq!(
            embedder.embed("Paris, France!").unwrap(),
            embedder.embed("paris france").unwrap()
        );
    }

    #[test]
    fn test_overlap_scores_higher() {
        let embedder = HashEmbedder::new(DEFAULT_DIMENSIONS);
        let base = embedder.embed("the capital of france is paris").unwrap();
        let close = embedder.embed("what is the capital of france").unwrap();
        let far = embedder.embed("rust borrow checker lifetimes").unwrap();

        assert!(cosine_similarity(&base, &close) > cosine_similarity(&base, &far));
    }

    #[test]
    fn test_batch_matches_single() {
        let embedder = HashEmbedder::new(32);
        let batch = embedder.embed_batch(&["one", "two"]).unwrap();
        assert_eq!(batch[0], embedder.embed("one").unwrap());
        assert_eq!(batch[1], embedder.embed("two").unwrap());
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let emb = HashEmbedder::new(16).embed("").unwrap();
        assert_eq!(emb.len(), 16);
        assert!(emb.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_zero_dimensions_clamped() {
        assert_eq!(HashEmbedder::new(0).dimensions(), 1);
    }
}
