//! Vector-store collaborator contract.
//!
//! The pipeline queries a tenant-scoped vector store for related past
//! discussions. Searches are advisory: the pipeline bounds them with a
//! short timeout and treats any failure as "no related content".

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use quorum_llm::{ProviderError, Result};

/// A single search hit from the vector store.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Backend identifier of the matched record.
    pub id: String,

    /// Similarity score, higher is closer.
    pub score: f32,

    /// Backend payload, typically the matched content and its metadata.
    pub payload: serde_json::Value,
}

impl SearchHit {
    /// The matched content text, when the payload carries one.
    pub fn content(&self) -> Option<&str> {
        self.payload.get("content").and_then(|v| v.as_str())
    }
}

/// Filter applied to a vector search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Restrict hits to one project.
    pub project_id: Option<String>,

    /// Exclude records originating from this session, so a meeting does
    /// not retrieve its own in-flight content.
    pub exclude_session: Option<String>,
}

/// Tenant-scoped vector search over past meeting content.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search for the `limit` records closest to `query`.
    async fn search(
        &self,
        organization_id: &str,
        query: &[f32],
        limit: usize,
        filter: SearchFilter,
    ) -> Result<Vec<SearchHit>>;
}

/// Shared handle to a vector store.
pub type SharedVectorStore = Arc<dyn VectorStore>;

/// Scripted vector store for tests.
#[derive(Debug, Default)]
pub struct MockVectorStore {
    hits: Vec<SearchHit>,
    fail: bool,
    search_count: Mutex<usize>,
}

impl MockVectorStore {
    /// A store that returns no hits.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A store that returns the given hits on every search.
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            fail: false,
            search_count: Mutex::new(0),
        }
    }

    /// A store whose searches always fail.
    pub fn failing() -> Self {
        Self {
            hits: Vec::new(),
            fail: true,
            search_count: Mutex::new(0),
        }
    }

    /// How many searches have been issued.
    pub async fn search_count(&self) -> usize {
        *self.search_count.lock().await
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn search(
        &self,
        _organization_id: &str,
        _query: &[f32],
        limit: usize,
        _filter: SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        *self.search_count.lock().await += 1;
        if self.fail {
            return Err(ProviderError::Backend("vector store unavailable".into()));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_respects_limit() {
        let hits = (0..5)
            .map(|i| SearchHit {
                id: format!("hit-{}", i),
                score: 0.9 - i as f32 * 0.1,
                payload: serde_json::json!({"content": format!("past discussion {}", i)}),
            })
            .collect();
        let store = MockVectorStore::with_hits(hits);

        let out = store
            .search("org-1", &[0.1, 0.2], 3, SearchFilter::default())
            .await
            .unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].content(), Some("past discussion 0"));
        assert_eq!(store.search_count().await, 1);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = MockVectorStore::failing();
        let result = store
            .search("org-1", &[0.1], 3, SearchFilter::default())
            .await;
        assert!(result.is_err());
    }
}
