use crate::domain::entities::embedding_record::EmbeddingRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub record: EmbeddingRecord,
    pub similarity_score: f64,
}
