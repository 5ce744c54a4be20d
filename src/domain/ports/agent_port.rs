use crate::domain::error::DomainError;
use crate::domain::values::conversation_stage::ConversationStage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub conversation_id: String,
    pub message: String,
    pub current_stage: ConversationStage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub response: String,
    pub current_stage: ConversationStage,
    pub agent_used: String,
}

/// Conversational agent reachable over the network. Its dialogue logic is
/// opaque to this crate.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn converse(&self, request: &AgentRequest) -> Result<AgentReply, DomainError>;
    async fn health(&self) -> Result<bool, DomainError>;
}
