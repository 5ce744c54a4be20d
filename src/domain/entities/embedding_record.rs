use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields tried in order when picking the text to embed for a record.
const EMBEDDING_TEXT_FIELDS: [&str; 2] = ["profile_text", "user_message"];

/// Named text fields plus open-ended JSON metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Overlay `other` on top of this payload. Keys present in both take the
    /// value from `other`.
    pub fn merge(&mut self, other: Payload) {
        self.fields.extend(other.fields);
        self.metadata.extend(other.metadata);
    }
}

/// Timestamps carry microsecond precision so they survive a storage round trip.
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub group_key: String,
    pub vector: Option<Vec<f32>>,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    pub fn new(group_key: String, vector: Option<Vec<f32>>, payload: Payload) -> Self {
        let now = now_micros();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_key,
            vector,
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_vector(&self) -> bool {
        self.vector.is_some()
    }

    pub fn update_payload(&mut self, changes: Payload) {
        self.payload.merge(changes);
        self.touch();
    }

    pub fn set_vector(&mut self, vector: Vec<f32>) {
        self.vector = Some(vector);
        self.touch();
    }

    /// Refresh `updated_at`, never letting it fall behind `created_at` even
    /// if the wall clock stepped backwards.
    pub fn touch(&mut self) {
        self.updated_at = now_micros().max(self.created_at);
    }

    /// Text representation for embedding
    pub fn embedding_text(&self) -> String {
        for name in EMBEDDING_TEXT_FIELDS {
            if let Some(text) = self.payload.field(name) {
                if !text.trim().is_empty() {
                    return text.to_string();
                }
            }
        }
        self.payload
            .fields
            .values()
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
