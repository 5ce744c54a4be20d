use crate::domain::error::DomainError;
use crate::domain::ports::agent_port::{AgentClient, AgentReply, AgentRequest};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-over-HTTP client for the conversational agent service.
pub struct HttpAgentClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAgentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn map_transport(&self, e: reqwest::Error) -> DomainError {
        if e.is_timeout() {
            DomainError::Timeout(self.timeout)
        } else {
            DomainError::Agent(format!("Connection error: {e}"))
        }
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn converse(&self, request: &AgentRequest) -> Result<AgentReply, DomainError> {
        debug!(
            conversation_id = %request.conversation_id,
            stage = %request.current_stage,
            "Sending message to agent"
        );
        let resp = self
            .client
            .post(format!("{}/conversation", self.base_url))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::Agent(format!("Agent returned {status}: {body}")));
        }

        resp.json::<AgentReply>()
            .await
            .map_err(|e| DomainError::Parse(format!("Agent reply: {e}")))
    }

    async fn health(&self) -> Result<bool, DomainError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let healthy = resp.status().is_success();
        if !healthy {
            warn!(status = %resp.status(), "Agent health check failed");
        }
        Ok(healthy)
    }
}
