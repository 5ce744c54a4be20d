use crate::application::on_store;
use crate::domain::entities::embedding_record::{EmbeddingRecord, Payload};
use crate::domain::error::DomainError;
use crate::domain::ports::corpus_store::CorpusStore;
use crate::domain::ports::embedding_port::{EmbeddingProvider, InputType};
use crate::domain::values::similarity::validate_vector;
use std::sync::Arc;
use tracing::{info, warn};

/// Ingestion and administrative mutations on the corpus.
pub struct RecordsUseCase {
    store: Arc<dyn CorpusStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl RecordsUseCase {
    pub fn new(
        store: Arc<dyn CorpusStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            dimension,
        }
    }

    /// Create a record. An explicit `vector` wins; otherwise `embed_text` is
    /// embedded. A failed embedding leaves the record without a vector rather
    /// than failing the add.
    pub async fn add(
        &self,
        group_key: String,
        payload: Payload,
        embed_text: Option<String>,
        vector: Option<Vec<f32>>,
    ) -> Result<EmbeddingRecord, DomainError> {
        if group_key.trim().is_empty() {
            return Err(DomainError::InvalidInput("group_key must not be empty".into()));
        }
        if let Some(v) = &vector {
            validate_vector(v, self.dimension).map_err(DomainError::InvalidInput)?;
        }

        let vector = match (vector, embed_text) {
            (Some(v), _) => Some(v),
            (None, Some(text)) if !text.trim().is_empty() => self.embed_document(text).await,
            (None, _) => None,
        };

        let record = EmbeddingRecord::new(group_key, vector, payload);
        let stored = record.clone();
        on_store(&self.store, move |s| s.insert(&stored)).await?;
        info!(
            id = %record.id,
            group_key = %record.group_key,
            has_vector = record.has_vector(),
            "Added record"
        );
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<EmbeddingRecord, DomainError> {
        let key = id.to_string();
        on_store(&self.store, move |s| s.get(&key))
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Merge `changes` into the record's payload and refresh `updated_at`.
    pub async fn update_payload(&self, id: &str, changes: Payload) -> Result<EmbeddingRecord, DomainError> {
        let key = id.to_string();
        on_store(&self.store, move |s| s.merge_payload(&key, changes))
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn attach_vector(&self, id: &str, vector: Vec<f32>) -> Result<EmbeddingRecord, DomainError> {
        validate_vector(&vector, self.dimension).map_err(DomainError::InvalidInput)?;
        let key = id.to_string();
        on_store(&self.store, move |s| s.set_vector(&key, vector))
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let key = id.to_string();
        if !on_store(&self.store, move |s| s.delete(&key)).await? {
            return Err(not_found(id));
        }
        info!(id, "Deleted record");
        Ok(())
    }

    async fn embed_document(&self, text: String) -> Option<Vec<f32>> {
        match self.embedder.embed(&[text], InputType::Document).await {
            Ok(vectors) => match vectors.into_iter().next().flatten() {
                Some(v) => match validate_vector(&v, self.dimension) {
                    Ok(()) => Some(v),
                    Err(e) => {
                        warn!("Discarding embedding: {e}");
                        None
                    }
                },
                None => None,
            },
            Err(e) => {
                warn!("Embedding failed, storing record without vector: {e}");
                None
            }
        }
    }
}

fn not_found(id: &str) -> DomainError {
    DomainError::NotFound(format!("Record {id}"))
}
