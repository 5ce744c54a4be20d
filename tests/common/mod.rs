//! Shared test helpers.
#![allow(dead_code)]

use simmatch::domain::entities::embedding_record::{EmbeddingRecord, Payload};
use simmatch::domain::error::DomainError;
use simmatch::domain::ports::agent_port::{AgentClient, AgentReply, AgentRequest};
use simmatch::domain::ports::corpus_store::{CandidateFilter, CorpusStats, CorpusStore};
use simmatch::domain::ports::embedding_port::{EmbeddingProvider, InputType};
use simmatch::infrastructure::embeddings::noop::NoopProvider;
use simmatch::infrastructure::memory::corpus_store::InMemoryCorpusStore;
use simmatch::infrastructure::sqlite::corpus_store::SqliteCorpusStore;
use simmatch::SimMatch;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn setup(dimension: usize) -> SimMatch {
    SimMatch::with_providers(
        Arc::new(InMemoryCorpusStore::new()),
        Arc::new(NoopProvider),
        dimension,
        TIMEOUT,
    )
}

pub fn setup_sqlite(dimension: usize) -> SimMatch {
    let store = SqliteCorpusStore::open(":memory:", dimension).unwrap();
    SimMatch::with_providers(Arc::new(store), Arc::new(NoopProvider), dimension, TIMEOUT)
}

pub fn setup_with_embedder(dimension: usize, embedder: Arc<dyn EmbeddingProvider>) -> SimMatch {
    SimMatch::with_providers(Arc::new(InMemoryCorpusStore::new()), embedder, dimension, TIMEOUT)
}

pub fn normalized(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

pub async fn add(sm: &SimMatch, group: &str, vector: Option<Vec<f32>>) -> EmbeddingRecord {
    sm.add_record(group.to_string(), Payload::new(), None, vector)
        .await
        .unwrap()
}

/// Maps texts containing a known keyword to a fixed 3-d vector.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    fn vector_for(text: &str) -> Option<Vec<f32>> {
        let text = text.to_lowercase();
        if text.contains("agency") {
            Some(vec![1.0, 0.0, 0.0])
        } else if text.contains("ecommerce") {
            Some(vec![0.0, 1.0, 0.0])
        } else if text.contains("saas") {
            Some(vec![0.0, 0.0, 1.0])
        } else {
            None
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, texts: &[String], _input_type: InputType) -> Result<Vec<Option<Vec<f32>>>, String> {
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        3
    }
}

/// Keyword embedder that lets another writer touch every pending record
/// while the embedding request is in flight.
pub struct InterleavingEmbedder {
    pub store: Arc<dyn CorpusStore>,
    pub meanwhile: Box<dyn Fn(&dyn CorpusStore, &str) + Send + Sync>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for InterleavingEmbedder {
    async fn embed(&self, texts: &[String], _input_type: InputType) -> Result<Vec<Option<Vec<f32>>>, String> {
        let pending = self.store.records_missing_vectors().map_err(|e| e.to_string())?;
        for record in &pending {
            (self.meanwhile)(self.store.as_ref(), &record.id);
        }
        Ok(texts.iter().map(|t| KeywordEmbedder::vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        3
    }
}

pub struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _texts: &[String], _input_type: InputType) -> Result<Vec<Option<Vec<f32>>>, String> {
        Err("provider offline".into())
    }

    fn dimension(&self) -> usize {
        3
    }
}

/// Store whose reads (`get` and both match lookups) block for `delay` before answering.
pub struct SlowStore {
    pub inner: InMemoryCorpusStore,
    pub delay: Duration,
}

impl CorpusStore for SlowStore {
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<EmbeddingRecord>, DomainError> {
        std::thread::sleep(self.delay);
        self.inner.fetch_candidates(filter)
    }

    fn fetch_latest_by_group(&self, group_key: &str) -> Result<Option<EmbeddingRecord>, DomainError> {
        std::thread::sleep(self.delay);
        self.inner.fetch_latest_by_group(group_key)
    }

    fn insert(&self, record: &EmbeddingRecord) -> Result<(), DomainError> {
        self.inner.insert(record)
    }

    fn get(&self, id: &str) -> Result<Option<EmbeddingRecord>, DomainError> {
        std::thread::sleep(self.delay);
        self.inner.get(id)
    }

    fn merge_payload(&self, id: &str, changes: Payload) -> Result<Option<EmbeddingRecord>, DomainError> {
        self.inner.merge_payload(id, changes)
    }

    fn set_vector(&self, id: &str, vector: Vec<f32>) -> Result<Option<EmbeddingRecord>, DomainError> {
        self.inner.set_vector(id, vector)
    }

    fn set_vector_if_missing(&self, id: &str, vector: Vec<f32>) -> Result<bool, DomainError> {
        self.inner.set_vector_if_missing(id, vector)
    }

    fn delete(&self, id: &str) -> Result<bool, DomainError> {
        self.inner.delete(id)
    }

    fn records_missing_vectors(&self) -> Result<Vec<EmbeddingRecord>, DomainError> {
        self.inner.records_missing_vectors()
    }

    fn stats(&self) -> Result<CorpusStats, DomainError> {
        self.inner.stats()
    }
}

/// Store that cannot reach its backend.
pub struct UnavailableStore;

impl CorpusStore for UnavailableStore {
    fn fetch_candidates(&self, _filter: &CandidateFilter) -> Result<Vec<EmbeddingRecord>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn fetch_latest_by_group(&self, _group_key: &str) -> Result<Option<EmbeddingRecord>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn insert(&self, _record: &EmbeddingRecord) -> Result<(), DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn get(&self, _id: &str) -> Result<Option<EmbeddingRecord>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn merge_payload(&self, _id: &str, _changes: Payload) -> Result<Option<EmbeddingRecord>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn set_vector(&self, _id: &str, _vector: Vec<f32>) -> Result<Option<EmbeddingRecord>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn set_vector_if_missing(&self, _id: &str, _vector: Vec<f32>) -> Result<bool, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn delete(&self, _id: &str) -> Result<bool, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn records_missing_vectors(&self) -> Result<Vec<EmbeddingRecord>, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }

    fn stats(&self) -> Result<CorpusStats, DomainError> {
        Err(DomainError::StorageUnavailable("connection refused".into()))
    }
}

/// Agent that echoes the message and advances greeting -> collecting_name.
#[derive(Default)]
pub struct StubAgent {
    pub seen: Mutex<Vec<AgentRequest>>,
}

#[async_trait::async_trait]
impl AgentClient for StubAgent {
    async fn converse(&self, request: &AgentRequest) -> Result<AgentReply, DomainError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(AgentReply {
            response: format!("You said: {}", request.message),
            current_stage: simmatch::domain::values::conversation_stage::ConversationStage::CollectingName,
            agent_used: "stub".into(),
        })
    }

    async fn health(&self) -> Result<bool, DomainError> {
        Ok(true)
    }
}
