

use async_trait::async_trait;
use thiserror::Error;

use crate::core::models::{ConceptRecord, GraphExport, QueryRecord, StoredConcept};


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Store call timed out after {0}s")]
    Timeout(u64),
    #[error("Query {query} failed: {message}")]
    Query { query: String, message: String },
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
}

impl StoreError {
    pub fn query(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Connectivity problems may clear up; a rejected query will not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::RetryExhausted { .. }
        )
    }
}


/// Durable home of concepts, queries, links and their edges.
///
/// Every write is a merge keyed by identity: concept name, query content and
/// link address. Repeating a write leaves exactly one node or edge behind, so
/// callers never lock around the store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Concepts worth ranking against `embedding`, at most `limit` of them.
    /// Backends with a vector index may return an approximate shortlist.
    async fn concept_candidates(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<StoredConcept>, StoreError>;

    /// Writes the concept, the query and the `SEARCHED_BY` edge between them
    /// as one operation.
    async fn create_concept_for_query(
        &self,
        concept: &ConceptRecord,
        query: &QueryRecord,
    ) -> Result<(), StoreError>;

    async fn upsert_query(&self, query: &QueryRecord) -> Result<(), StoreError>;

    async fn connect_concept_to_query(
        &self,
        concept_name: &str,
        query: &QueryRecord,
    ) -> Result<(), StoreError>;

    async fn record_click(&self, query: &QueryRecord, address: &str) -> Result<(), StoreError>;

    /// Links reachable from the concept via `SEARCHED_BY` then `CLICKED`.
    async fn links_for_concept(&self, concept_name: &str) -> Result<Vec<String>, StoreError>;

    /// Whole graph. Unbounded.
    async fn export_graph(&self) -> Result<GraphExport, StoreError>;

    fn backend_name(&self) -> &str;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
