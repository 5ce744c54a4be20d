use crate::domain::entities::embedding_record::{EmbeddingRecord, Payload};
use crate::domain::error::DomainError;

/// Narrows what [`CorpusStore::fetch_candidates`] returns.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    /// Drop every record belonging to this group.
    pub exclude_group_key: Option<String>,
    /// Query vector hint. Index-backed stores may use it to skip records that
    /// cannot be near the query; exact stores ignore it.
    pub near: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CorpusStats {
    pub total_records: usize,
    pub with_vector: usize,
    pub groups: usize,
}

/// Storage collaborator owning the corpus.
///
/// Reads must be snapshot-consistent per call: a record either appears once
/// with a matching vector and payload, or not at all.
pub trait CorpusStore: Send + Sync {
    /// Records with a non-null vector that pass `filter`.
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<EmbeddingRecord>, DomainError>;
    /// Most recently created record of `group_key` that carries a vector.
    fn fetch_latest_by_group(&self, group_key: &str) -> Result<Option<EmbeddingRecord>, DomainError>;

    fn insert(&self, record: &EmbeddingRecord) -> Result<(), DomainError>;
    fn get(&self, id: &str) -> Result<Option<EmbeddingRecord>, DomainError>;

    // Each mutation reads and writes the record as one atomic step.
    // `None` / false when `id` is unknown.

    /// Merge `changes` into the stored payload and refresh `updated_at`.
    fn merge_payload(&self, id: &str, changes: Payload) -> Result<Option<EmbeddingRecord>, DomainError>;
    /// Replace the stored vector and refresh `updated_at`.
    fn set_vector(&self, id: &str, vector: Vec<f32>) -> Result<Option<EmbeddingRecord>, DomainError>;
    /// Store `vector` only if the record still has none. Returns whether it was stored.
    fn set_vector_if_missing(&self, id: &str, vector: Vec<f32>) -> Result<bool, DomainError>;
    /// Returns false when `id` is unknown.
    fn delete(&self, id: &str) -> Result<bool, DomainError>;
    fn records_missing_vectors(&self) -> Result<Vec<EmbeddingRecord>, DomainError>;
    fn stats(&self) -> Result<CorpusStats, DomainError>;
}
