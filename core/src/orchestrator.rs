use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::{
    agent::{Agent, ToolTrace},
    context::ContextWindow,
    error::{RecallError, Result},
    memory::{augment_message, MemoryRecord, MemoryStore},
    message::Message,
    provider::TokenUsage,
    DEFAULT_MEMORY_SEARCH_LIMIT,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub memory_search_limit: usize,
    pub memory_timeout: Duration,
    /// Bounds the whole model invocation, nested tool calls included.
    pub model_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            memory_search_limit: DEFAULT_MEMORY_SEARCH_LIMIT,
            memory_timeout: Duration::from_secs(10),
            model_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum MemoryWrite {
    Stored,
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub answer: String,
    pub memories_used: usize,
    pub tool_trace: Vec<ToolTrace>,
    pub usage: TokenUsage,
    pub memory_write: MemoryWrite,
}

/// Runs one user turn at a time: recall, augment, invoke, commit, remember.
///
/// Owns the short-term window exclusively. The window only changes after
/// the backend produced an answer; memory failures never fail a turn.
pub struct TurnOrchestrator {
    agent: Agent,
    memory: Arc<dyn MemoryStore>,
    window: ContextWindow,
    config: OrchestratorConfig,
}

impl TurnOrchestrator {
    pub fn new(agent: Agent, memory: Arc<dyn MemoryStore>) -> Self {
        Self {
            agent,
            memory,
            window: ContextWindow::default(),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds the short-term window. It must hold complete pairs only, so a
    /// turn can never be answered and then fail to commit.
    pub fn with_window(mut self, window: ContextWindow) -> Result<Self> {
        if !window.is_balanced() {
            return Err(RecallError::UnansweredMessage);
        }
        self.window = window;
        Ok(self)
    }

    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn reset_window(&mut self) {
        self.window.clear();
    }

    pub async fn handle_turn(&mut self, raw_user_text: &str, user_id: &str) -> Result<TurnOutcome> {
        tracing::info!(user_id, window = self.window.len(), "turn started");

        let memories = self.recall(raw_user_text, user_id).await;
        let message = match augment_message(raw_user_text, &memories) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "memory augmentation failed, sending raw message");
                raw_user_text.to_string()
            }
        };

        let run = with_timeout(
            "model invocation",
            self.config.model_timeout,
            self.agent.run(&message, &self.window),
        )
        .await?;

        let evicted = self
            .window
            .commit_turn(Message::user(raw_user_text), Message::assistant(&run.text))?;
        if evicted > 0 {
            tracing::debug!(evicted, "evicted oldest pairs from context window");
        }

        let memory_write = self.remember(raw_user_text, &run.text, user_id).await;

        tracing::info!(
            user_id,
            memories = memories.len(),
            tool_calls = run.tool_trace.len(),
            window = self.window.len(),
            "turn finished"
        );

        Ok(TurnOutcome {
            answer: run.text,
            memories_used: memories.len(),
            tool_trace: run.tool_trace,
            usage: run.usage,
            memory_write,
        })
    }

    /// Fails soft: any search error or timeout yields no memories.
    async fn recall(&self, query: &str, user_id: &str) -> Vec<MemoryRecord> {
        let search = self.memory.search(query, user_id, self.config.memory_search_limit);
        match with_timeout("memory search", self.config.memory_timeout, search).await {
            Ok(memories) => {
                tracing::debug!(store = self.memory.name(), found = memories.len(), "memory search");
                memories
            }
            Err(e) => {
                tracing::warn!(store = self.memory.name(), error = %e, "memory search failed, continuing without memories");
                Vec::new()
            }
        }
    }

    /// Best effort: the answer has already been produced.
    async fn remember(&self, user_text: &str, answer: &str, user_id: &str) -> MemoryWrite {
        let turn = [Message::user(user_text), Message::assistant(answer)];
        let add = self.memory.add(&turn, user_id);
        match with_timeout("memory write", self.config.memory_timeout, add).await {
            Ok(()) => MemoryWrite::Stored,
            Err(e) => {
                tracing::warn!(store = self.memory.name(), error = %e, "memory write failed");
                MemoryWrite::Failed(e.to_string())
            }
        }
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| RecallError::Timeout { operation, limit })?
}
