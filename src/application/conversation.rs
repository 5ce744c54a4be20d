use crate::domain::entities::match_result::MatchResult;
use crate::domain::error::DomainError;
use crate::domain::ports::agent_port::{AgentClient, AgentReply, AgentRequest};
use crate::domain::values::conversation_stage::ConversationStage;
use crate::domain::values::match_options::MatchOptions;
use crate::application::matcher::MatcherUseCase;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Agent reply together with similar conversations from other groups.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub reply: AgentReply,
    pub related: Vec<MatchResult>,
}

/// Relays a message to the conversational agent and looks up similar
/// conversation history for the same group.
pub struct ConversationUseCase {
    agent: Arc<dyn AgentClient>,
    matcher: MatcherUseCase,
}

impl ConversationUseCase {
    pub fn new(agent: Arc<dyn AgentClient>, matcher: MatcherUseCase) -> Self {
        Self { agent, matcher }
    }

    pub async fn send(
        &self,
        conversation_id: String,
        message: String,
        current_stage: ConversationStage,
    ) -> Result<ConversationTurn, DomainError> {
        if message.trim().is_empty() {
            return Err(DomainError::InvalidInput("Message must not be empty".into()));
        }
        let request = AgentRequest {
            conversation_id,
            message,
            current_stage,
        };
        let reply = self.agent.converse(&request).await?;

        // A group without any vector yet simply has no related history.
        let related = match self
            .matcher
            .match_by_group_history(&request.conversation_id, MatchOptions::by_group())
            .await
        {
            Ok(found) => found,
            Err(DomainError::NotFound(_)) => vec![],
            Err(e) => return Err(e),
        };
        debug!(
            conversation_id = %request.conversation_id,
            stage = %reply.current_stage,
            related = related.len(),
            "Conversation turn complete"
        );
        Ok(ConversationTurn { reply, related })
    }

    pub async fn health(&self) -> Result<bool, DomainError> {
        self.agent.health().await
    }
}
