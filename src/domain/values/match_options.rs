use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_VECTOR_THRESHOLD: f64 = 0.7;
pub const DEFAULT_VECTOR_LIMIT: usize = 5;
pub const DEFAULT_GROUP_THRESHOLD: f64 = 0.8;
pub const DEFAULT_GROUP_LIMIT: usize = 10;

/// Threshold, result cap and deadline for a single match call.
///
/// A candidate is kept only when its score is strictly greater than
/// `threshold`. `timeout` of `None` falls back to the matcher's default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    pub threshold: f64,
    pub limit: usize,
    #[serde(default, skip_serializing)]
    pub timeout: Option<Duration>,
}

impl MatchOptions {
    pub fn new(threshold: f64, limit: usize) -> Self {
        Self {
            threshold,
            limit,
            timeout: None,
        }
    }

    /// Defaults for matching against an explicit query vector.
    pub fn by_vector() -> Self {
        Self::new(DEFAULT_VECTOR_THRESHOLD, DEFAULT_VECTOR_LIMIT)
    }

    /// Defaults for matching against a group's latest vector.
    pub fn by_group() -> Self {
        Self::new(DEFAULT_GROUP_THRESHOLD, DEFAULT_GROUP_LIMIT)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() {
            return Err(format!("Threshold must be finite, got {}", self.threshold));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err("Timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::by_vector()
    }
}
