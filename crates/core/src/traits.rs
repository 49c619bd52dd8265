use crate::error::SearchError;
use crate::models::{PublicationRecord, ScoredHit, SearchHit};
use async_trait::async_trait;

/// Query-side contract a vector search engine must satisfy to serve
/// the search API. Indexing internals stay behind this seam.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn ensure_collection(&self) -> Result<(), SearchError>;

    async fn index_records(
        &self,
        records: &[PublicationRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError>;

    async fn search_vector(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredHit>, SearchError>;
}

/// What the predictive search client needs from a backend: query
/// completions and ranked results.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn predict(&self, partial_query: &str, limit: usize)
        -> Result<Vec<String>, SearchError>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError>;
}
