use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Every matcher operation is read-only, so these are safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Timeout(_) | DomainError::StorageUnavailable(_))
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Parse(e.to_string())
    }
}
