#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Document,
    Query,
}

#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One entry per input text. `None` means the provider has no vector for
    /// that text; callers keep the record without one.
    async fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Option<Vec<f32>>>, String>;
    /// 0 when the provider never produces vectors.
    fn dimension(&self) -> usize;
}
