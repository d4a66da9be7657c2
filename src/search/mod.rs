//! Document retrieval.
//!
//! Queries the `documents` collection and filters each query's hits by
//! distance, then by token budget.

use crate::core::RetrievalResult;
use crate::error::Result;
use crate::filter::ResultFilter;
use crate::storage::{DOCUMENTS_COLLECTION, VectorStore};

/// Default number of hits requested per query.
pub const DEFAULT_MAX_RESULTS: usize = 96;

/// Retrieval over the document store.
#[derive(Debug, Clone, Copy)]
pub struct SearchEngine {
    filter: ResultFilter,
    max_results: usize,
}

impl SearchEngine {
    /// Creates an engine requesting `max_results` hits per query.
    #[must_use]
    pub const fn new(filter: ResultFilter, max_results: usize) -> Self {
        Self {
            filter,
            max_results,
        }
    }

    /// The result filter.
    #[must_use]
    pub const fn filter(&self) -> &ResultFilter {
        &self.filter
    }

    /// Hits requested from the store per query.
    #[must_use]
    pub const fn max_results(&self) -> usize {
        self.max_results
    }

    /// Runs every query and returns one filtered result group per query,
    /// in query order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub fn search(&self, store: &dyn VectorStore, queries: &[&str]) -> Result<Vec<RetrievalResult>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let groups = store.query(DOCUMENTS_COLLECTION, queries, self.max_results)?;
        let filtered: Vec<RetrievalResult> =
            groups.into_iter().map(|group| self.filter.apply(group)).collect();

        tracing::info!(
            queries = queries.len(),
            kept = filtered.iter().map(RetrievalResult::len).sum::<usize>(),
            "search complete"
        );
        Ok(filtered)
    }

    /// Runs a single query.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub fn search_one(&self, store: &dyn VectorStore, query: &str) -> Result<RetrievalResult> {
        Ok(self
            .search(store, &[query])?
            .into_iter()
            .next()
            .unwrap_or_default())
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(ResultFilter::new(1.2, 2048), DEFAULT_MAX_RESULTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteVectorStore;

    fn store() -> SqliteVectorStore {
        let mut store = SqliteVectorStore::in_memory().unwrap();
        store.init().unwrap();
        let ids: Vec<String> = (1..=4).map(|i| format!("doc{i}")).collect();
        let docs: Vec<String> = vec![
            "paris is the capital of france".into(),
            "rome is the capital of italy".into(),
            "bread is baked in ovens".into(),
            "the capital of france has many museums".into(),
        ];
        store.upsert(DOCUMENTS_COLLECTION, &ids, &docs, None).unwrap();
        store
    }

    #[test]
    fn test_one_group_per_query() {
        let store = store();
        let engine = SearchEngine::new(ResultFilter::new(2.0, 2048), 10);
        let groups = engine.search(&store, &["capital of france", "ovens"]).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 4);
        assert_eq!(groups[1].ids()[0], "doc3");
    }

    #[test]
    fn test_distance_filter_applies() {
        let store = store();
        let engine = SearchEngine::new(ResultFilter::new(0.0, 2048), 10);
        let result = engine.search_one(&store, "zzz unrelated").unwrap();
        assert!(result.distances().iter().all(|&d| d <= 0.0));
    }

    #[test]
    fn test_token_budget_applies() {
        let store = store();
        let engine = SearchEngine::new(ResultFilter::new(2.0, 9), 10);
        let result = engine.search_one(&store, "capital").unwrap();
        // Documents estimate 6 to 9 tokens each; no two fit in 9.
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_max_results_caps_hits() {
        let store = store();
        let engine = SearchEngine::new(ResultFilter::new(2.0, 2048), 2);
        assert_eq!(engine.search_one(&store, "capital").unwrap().len(), 2);
    }

    #[test]
    fn test_no_queries() {
        let store = store();
        assert!(SearchEngine::default().search(&store, &[]).unwrap().is_empty());
    }
}
