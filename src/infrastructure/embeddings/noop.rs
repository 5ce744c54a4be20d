use crate::domain::ports::embedding_port::{EmbeddingProvider, InputType};

/// Provider for deployments where vectors arrive out of band. Records added
/// through it stay vector-less until a vector is attached or a reindex runs
/// with a real provider.
pub struct NoopProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for NoopProvider {
    async fn embed(&self, texts: &[String], _input_type: InputType) -> Result<Vec<Option<Vec<f32>>>, String> {
        Ok(texts.iter().map(|_| None).collect())
    }

    fn dimension(&self) -> usize {
        0
    }
}
