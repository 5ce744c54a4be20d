use crate::application::on_store;
use crate::domain::error::DomainError;
use crate::domain::ports::corpus_store::CorpusStore;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusReport {
    pub total_records: usize,
    pub with_vector: usize,
    pub groups: usize,
    pub dimension: usize,
}

pub struct StatsUseCase {
    store: Arc<dyn CorpusStore>,
    dimension: usize,
}

impl StatsUseCase {
    pub fn new(store: Arc<dyn CorpusStore>, dimension: usize) -> Self {
        Self { store, dimension }
    }

    pub async fn stats(&self) -> Result<CorpusReport, DomainError> {
        let s = on_store(&self.store, |store| store.stats()).await?;
        Ok(CorpusReport {
            total_records: s.total_records,
            with_vector: s.with_vector,
            groups: s.groups,
            dimension: self.dimension,
        })
    }
}
