use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One durable memory fragment owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMemory {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// bm25 relevance, lower is better. Only set on search results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl StoredMemory {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            text: text.into(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
            score: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
