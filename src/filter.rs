//! Retrieval result filtering.
//!
//! Both filters compute the positions to keep and then materialize a new
//! [`RetrievalResult`] through [`RetrievalResult::retain_indices`], so the
//! four parallel sequences always stay aligned. The distance filter is a
//! quality gate; the token filter is a hard cap applied after it.

use crate::core::RetrievalResult;
use crate::tokens::{word_count, words_to_tokens};

/// Quality and budget limits applied to retrieved hits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultFilter {
    /// Hits farther than this are dropped.
    pub max_distance: f32,
    /// Estimated token cap over the kept documents.
    pub max_tokens: usize,
}

impl ResultFilter {
    /// Creates a filter with the given limits.
    #[must_use]
    pub const fn new(max_distance: f32, max_tokens: usize) -> Self {
        Self {
            max_distance,
            max_tokens,
        }
    }

    /// Applies the distance filter, then the token filter.
    #[must_use]
    pub fn apply(&self, result: RetrievalResult) -> RetrievalResult {
        let before = result.len();
        let result = filter_by_token_budget(
            filter_by_distance(result, self.max_distance),
            self.max_tokens,
        );
        tracing::debug!(
            before,
            after = result.len(),
            max_distance = self.max_distance,
            max_tokens = self.max_tokens,
            "filtered retrieval result"
        );
        result
    }
}

/// Drops every hit whose distance exceeds `max_distance`.
#[must_use]
pub fn filter_by_distance(result: RetrievalResult, max_distance: f32) -> RetrievalResult {
    let keep: Vec<usize> = result
        .distances()
        .iter()
        .enumerate()
        .filter(|&(_, &distance)| distance <= max_distance)
        .map(|(idx, _)| idx)
        .collect();
    result.retain_indices(&keep)
}

/// Cuts the result at the first hit where the running token estimate
/// exceeds `max_tokens`. The output is always a prefix of the input.
#[must_use]
pub fn filter_by_token_budget(result: RetrievalResult, max_tokens: usize) -> RetrievalResult {
    let cutoff = token_cutoff(result.documents(), max_tokens);
    if cutoff == result.len() {
        return result;
    }
    let keep: Vec<usize> = (0..cutoff).collect();
    result.retain_indices(&keep)
}

fn token_cutoff(documents: &[String], max_tokens: usize) -> usize {
    let mut total = 0;
    for (idx, document) in documents.iter().enumerate() {
        total += words_to_tokens(word_count(document));
        if total > max_tokens {
            return idx;
        }
    }
    documents.len()
}
