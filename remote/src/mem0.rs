use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use async_trait::async_trait;
use recall_core::{
    error::{RecallError, Result},
    memory::{MemoryRecord, MemoryStore},
    message::Message,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MEM0_URL: &str = "http://localhost:8888";

#[derive(Clone, Serialize, Deserialize)]
pub struct Mem0Config {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Mem0Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MEM0_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for Mem0Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mem0Config")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Long-term memory held by a mem0-compatible server.
pub struct Mem0Client {
    config: Mem0Config,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    user_id: &'a str,
    limit: usize,
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Servers answer either `{"results": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Wrapped { results: Vec<WireMemory> },
    Bare(Vec<WireMemory>),
}

#[derive(Debug, Deserialize)]
struct WireMemory {
    #[serde(default)]
    id: Option<String>,
    memory: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, Value>>,
    #[serde(default)]
    score: Option<f64>,
}

impl Mem0Client {
    pub fn new(config: Mem0Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::InvalidConfig(format!("failed to build memory client: {e}")))?;

        Ok(Self { config, client })
    }

    fn post(&self, route: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), route);
        let request = self.client.post(url);
        match &self.config.api_key {
            Some(key) => request.header("Authorization", format!("Token {key}")),
            None => request,
        }
    }

    async fn send<T: Serialize + ?Sized>(&self, route: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .post(route)
            .json(body)
            .send()
            .await
            .map_err(|e| RecallError::Memory(format!("{route} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RecallError::Memory(format!("{route} returned {status}: {text}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl MemoryStore for Mem0Client {
    async fn search(&self, query: &str, user_id: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        let response = self.send("search", &SearchRequest { query, user_id, limit }).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RecallError::Memory(format!("malformed search response: {e}")))?;

        let memories = match parsed {
            SearchResponse::Wrapped { results } | SearchResponse::Bare(results) => results,
        };

        Ok(memories
            .into_iter()
            .take(limit)
            .map(|m| MemoryRecord {
                id: m.id,
                text: m.memory,
                user_id: m.user_id.unwrap_or_else(|| user_id.to_string()),
                metadata: m.metadata,
                score: m.score,
                created_at: None,
            })
            .collect())
    }

    async fn add(&self, messages: &[Message], user_id: &str) -> Result<()> {
        let body = AddRequest {
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role().as_str(),
                    content: m.content(),
                })
                .collect(),
            user_id,
        };
        self.send("memories", &body).await?;
        tracing::debug!(user_id, count = messages.len(), "stored turn in remote memory");
        Ok(())
    }

    fn name(&self) -> &str {
        "mem0"
    }
}
