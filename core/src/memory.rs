use std::collections::HashMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use recall_storage::{Storage, StoredMemory};
use crate::error::{RecallError, Result};
use crate::message::Message;

/// A durable fragment recalled from long-term memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    pub fn new(text: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            user_id: user_id.into(),
            metadata: None,
            score: None,
            created_at: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

impl From<StoredMemory> for MemoryRecord {
    fn from(stored: StoredMemory) -> Self {
        let metadata = match stored.metadata {
            serde_json::Value::Object(map) if !map.is_empty() => Some(map.into_iter().collect()),
            _ => None,
        };
        Self {
            id: Some(stored.id),
            text: stored.text,
            user_id: stored.user_id,
            metadata,
            score: stored.score,
            created_at: Some(stored.created_at),
        }
    }
}

/// Long-term, semantically searchable memory collaborator.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Relevance-ranked, most relevant first.
    async fn search(&self, query: &str, user_id: &str, limit: usize) -> Result<Vec<MemoryRecord>>;

    async fn add(&self, messages: &[Message], user_id: &str) -> Result<()>;

    fn name(&self) -> &str;
}

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static regex");
    static ref TEMPLATES: Tera = {
        let mut tera = Tera::default();
        tera.add_raw_template(
            "memories",
            "Relevant memories:\n{% for memory in memories %}- {{ memory }}\n{% endfor %}",
        )
        .expect("static template");
        tera
    };
}

/// Prefixes `raw` with a "Relevant memories" block, one bullet per memory.
///
/// Pure: the same inputs always render the same bytes. When no memory has
/// any visible text the raw message is returned untouched.
pub fn augment_message(raw: &str, memories: &[MemoryRecord]) -> Result<String> {
    let lines: Vec<String> = memories
        .iter()
        .map(|m| WHITESPACE.replace_all(m.text.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return Ok(raw.to_string());
    }

    let mut context = Context::new();
    context.insert("memories", &lines);
    let block = TEMPLATES
        .render("memories", &context)
        .map_err(|e| RecallError::Memory(e.to_string()))?;

    Ok(format!("{}\n{}", block, raw))
}

/// Long-term memory kept in the local SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteMemoryStore {
    storage: Storage,
}

impl SqliteMemoryStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn search(&self, query: &str, user_id: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        let storage = self.storage.clone();
        let query = query.to_string();
        let user_id = user_id.to_string();

        let stored = tokio::task::spawn_blocking(move || storage.search_memories(&user_id, &query, limit))
            .await
            .map_err(|e| RecallError::Memory(e.to_string()))??;

        Ok(stored.into_iter().map(MemoryRecord::from).collect())
    }

    async fn add(&self, messages: &[Message], user_id: &str) -> Result<()> {
        let batch: Vec<StoredMemory> = messages
            .iter()
            .filter(|m| !m.content().trim().is_empty())
            .map(|m| {
                StoredMemory::new(user_id, m.content())
                    .with_metadata(serde_json::json!({ "role": m.role() }))
            })
            .collect();

        if batch.is_empty() {
            return Ok(());
        }

        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.add_memories(&batch))
            .await
            .map_err(|e| RecallError::Memory(e.to_string()))??;

        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

/// Memory disabled: recalls nothing, forgets everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMemoryStore;

#[async_trait]
impl MemoryStore for NoopMemoryStore {
    async fn search(&self, _query: &str, _user_id: &str, _limit: usize) -> Result<Vec<MemoryRecord>> {
        Ok(Vec::new())
    }

    async fn add(&self, _messages: &[Message], _user_id: &str) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_augment_without_memories_is_identity() {
        assert_eq!(augment_message("Hello", &[]).unwrap(), "Hello");
        let blank = vec![MemoryRecord::new("   \n\t", "u")];
        assert_eq!(augment_message("Hello", &blank).unwrap(), "Hello");
    }

    #[test]
    fn test_augment_renders_one_bullet_per_memory() {
        let memories = vec![
            MemoryRecord::new("Name is Alice", "u"),
            MemoryRecord::new("Lives in\n  New York", "u"),
        ];
        let augmented = augment_message("What's the weather?", &memories).unwrap();
        assert_eq!(
            augmented,
            "Relevant memories:\n- Name is Alice\n- Lives in New York\n\nWhat's the weather?"
        );
    }

    #[test]
    fn test_augment_is_deterministic() {
        let memories = vec![MemoryRecord::new("<likes> & \"quotes\"", "u")];
        let first = augment_message("hi", &memories).unwrap();
        let second = augment_message("hi", &memories).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert!(first.contains("- <likes> & \"quotes\"\n"));
    }

    #[test]
    fn test_record_from_stored_memory() {
        let stored = StoredMemory::new("alice", "likes tea")
            .with_metadata(serde_json::json!({"role": "user"}));
        let record = MemoryRecord::from(stored.clone());
        assert_eq!(record.id.as_deref(), Some(stored.id.as_str()));
        assert_eq!(record.metadata.unwrap()["role"], "user");

        let bare = MemoryRecord::from(StoredMemory::new("alice", "x"));
        assert!(bare.metadata.is_none());
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let store = SqliteMemoryStore::new(Storage::memory().unwrap());
        store
            .add(
                &[Message::user("My favourite city is Porto"), Message::assistant(""), Message::assistant("Noted!")],
                "alice",
            )
            .await
            .unwrap();

        assert_eq!(store.storage().count_memories("alice").unwrap(), 2);

        let found = store.search("which city do I like?", "alice", 5).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "My favourite city is Porto");
        assert_eq!(found[0].user_id, "alice");

        assert!(store.search("city", "bob", 5).await.unwrap().is_empty());
    }
}
