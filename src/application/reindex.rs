use crate::application::on_store;
use crate::domain::error::DomainError;
use crate::domain::ports::corpus_store::CorpusStore;
use crate::domain::ports::embedding_port::{EmbeddingProvider, InputType};
use crate::domain::values::similarity::validate_vector;
use std::sync::Arc;
use tracing::{info, warn};

const BATCH_SIZE: usize = 32;

pub struct ReindexUseCase {
    store: Arc<dyn CorpusStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl ReindexUseCase {
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

    /// Embed every record that has no vector yet. Returns how many records
    /// received one.
    pub async fn execute(&self) -> Result<usize, DomainError> {
        let records = on_store(&self.store, |s| s.records_missing_vectors()).await?;
        if records.is_empty() {
            return Ok(0);
        }

        let mut filled = 0;
        for chunk in records.chunks(BATCH_SIZE) {
            let texts: Vec<String> = chunk.iter().map(|r| r.embedding_text()).collect();
            let vectors = self
                .embedder
                .embed(&texts, InputType::Document)
                .await
                .map_err(DomainError::Embedding)?;
            for (record, vector) in chunk.iter().zip(vectors) {
                let Some(vector) = vector else { continue };
                if let Err(e) = validate_vector(&vector, self.dimension) {
                    warn!(id = %record.id, "Skipping embedding: {e}");
                    continue;
                }
                // Records that gained a vector meanwhile keep it.
                let id = record.id.clone();
                if on_store(&self.store, move |s| s.set_vector_if_missing(&id, vector)).await? {
                    filled += 1;
                }
            }
        }

        info!(filled, pending = records.len() - filled, "Reindex finished");
        Ok(filled)
    }
}
