pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

use crate::application::conversation::{ConversationTurn, ConversationUseCase};
use crate::application::matcher::MatcherUseCase;
use crate::application::records::RecordsUseCase;
use crate::application::reindex::ReindexUseCase;
use crate::application::stats::{CorpusReport, StatsUseCase};
use crate::config::{Settings, StoreKind};
use crate::domain::entities::embedding_record::{EmbeddingRecord, Payload};
use crate::domain::entities::match_result::MatchResult;
use crate::domain::error::DomainError;
use crate::domain::ports::agent_port::AgentClient;
use crate::domain::ports::corpus_store::CorpusStore;
use crate::domain::ports::embedding_port::EmbeddingProvider;
use crate::domain::values::conversation_stage::ConversationStage;
use crate::domain::values::match_options::MatchOptions;
use crate::infrastructure::agent::http::HttpAgentClient;
use crate::infrastructure::embeddings::noop::NoopProvider;
use crate::infrastructure::embeddings::openai::OpenAiProvider;
use crate::infrastructure::index::build_index;
use crate::infrastructure::memory::corpus_store::InMemoryCorpusStore;
use crate::infrastructure::sqlite::corpus_store::SqliteCorpusStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct SimMatch {
    matcher_uc: MatcherUseCase,
    records_uc: RecordsUseCase,
    reindex_uc: ReindexUseCase,
    stats_uc: StatsUseCase,
    conversation_uc: Option<ConversationUseCase>,
}

impl SimMatch {
    pub fn new(settings: &Settings) -> Result<Self, DomainError> {
        let embedder: Arc<dyn EmbeddingProvider> = match settings.embedding_provider.as_str() {
            "openai" => Arc::new(OpenAiProvider::new(
                settings.embedding_api_key.clone(),
                settings.embedding_model.clone(),
                settings.embedding_base_url.clone(),
            )),
            "noop" => Arc::new(NoopProvider),
            other => {
                return Err(DomainError::InvalidInput(format!(
                    "Unknown embedding provider: {other}"
                )))
            }
        };

        let store: Arc<dyn CorpusStore> = match settings.store {
            StoreKind::Sqlite => Arc::new(SqliteCorpusStore::open(
                &settings.db_path,
                settings.dimension,
            )?),
            StoreKind::Memory => Arc::new(InMemoryCorpusStore::with_index(build_index(
                settings.index,
                settings.ivf,
            ))),
        };

        let agent: Arc<dyn AgentClient> =
            Arc::new(HttpAgentClient::new(settings.agent_url.clone(), settings.timeout));

        Ok(Self::with_providers(store, embedder, settings.dimension, settings.timeout).with_agent(agent))
    }

    pub fn with_providers(
        store: Arc<dyn CorpusStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        dimension: usize,
        timeout: Duration,
    ) -> Self {
        let provider_dim = embedder.dimension();
        if provider_dim > 0 && provider_dim != dimension {
            warn!(
                provider_dim,
                corpus_dim = dimension,
                "Embedding provider dimension differs from corpus dimension; its vectors will be rejected"
            );
        }

        Self {
            matcher_uc: MatcherUseCase::new(store.clone(), embedder.clone(), dimension, timeout),
            records_uc: RecordsUseCase::new(store.clone(), embedder.clone(), dimension),
            reindex_uc: ReindexUseCase::new(store.clone(), embedder, dimension),
            stats_uc: StatsUseCase::new(store, dimension),
            conversation_uc: None,
        }
    }

    pub fn with_agent(mut self, agent: Arc<dyn AgentClient>) -> Self {
        self.conversation_uc = Some(ConversationUseCase::new(agent, self.matcher_uc.clone()));
        self
    }

    /// Shareable handle for concurrent matching.
    pub fn matcher(&self) -> MatcherUseCase {
        self.matcher_uc.clone()
    }

    // Delegating methods
    pub async fn add_record(
        &self,
        group_key: String,
        payload: Payload,
        embed_text: Option<String>,
        vector: Option<Vec<f32>>,
    ) -> Result<EmbeddingRecord, DomainError> {
        self.records_uc.add(group_key, payload, embed_text, vector).await
    }

    pub async fn get_record(&self, id: &str) -> Result<EmbeddingRecord, DomainError> {
        self.records_uc.get(id).await
    }

    pub async fn update_payload(&self, id: &str, changes: Payload) -> Result<EmbeddingRecord, DomainError> {
        self.records_uc.update_payload(id, changes).await
    }

    pub async fn attach_vector(&self, id: &str, vector: Vec<f32>) -> Result<EmbeddingRecord, DomainError> {
        self.records_uc.attach_vector(id, vector).await
    }

    pub async fn delete_record(&self, id: &str) -> Result<(), DomainError> {
        self.records_uc.delete(id).await
    }

    pub async fn match_by_vector(
        &self,
        query: &[f32],
        options: MatchOptions,
    ) -> Result<Vec<MatchResult>, DomainError> {
        self.matcher_uc.match_by_vector(query, options).await
    }

    pub async fn match_by_group_history(
        &self,
        group_key: &str,
        options: MatchOptions,
    ) -> Result<Vec<MatchResult>, DomainError> {
        self.matcher_uc.match_by_group_history(group_key, options).await
    }

    pub async fn match_by_text(
        &self,
        text: &str,
        options: MatchOptions,
    ) -> Result<Vec<MatchResult>, DomainError> {
        self.matcher_uc.match_by_text(text, options).await
    }

    pub async fn reindex(&self) -> Result<usize, DomainError> {
        self.reindex_uc.execute().await
    }

    pub async fn stats(&self) -> Result<CorpusReport, DomainError> {
        self.stats_uc.stats().await
    }

    pub async fn converse(
        &self,
        conversation_id: String,
        message: String,
        stage: ConversationStage,
    ) -> Result<ConversationTurn, DomainError> {
        self.conversation()?.send(conversation_id, message, stage).await
    }

    pub async fn agent_health(&self) -> Result<bool, DomainError> {
        self.conversation()?.health().await
    }

    fn conversation(&self) -> Result<&ConversationUseCase, DomainError> {
        self.conversation_uc
            .as_ref()
            .ok_or_else(|| DomainError::Agent("No agent client configured".into()))
    }
}
