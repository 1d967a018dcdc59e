use std::collections::VecDeque;
use std::sync::Mutex;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::{RecallError, Result};
use crate::message::{Message, MessageRole};
use crate::tool::{ToolCall, ToolSchema};

/// One entry of a backend exchange. Lives only for the duration of a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum PromptMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        PromptMessage::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        PromptMessage::User { content: content.into() }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        PromptMessage::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

impl From<&Message> for PromptMessage {
    fn from(message: &Message) -> Self {
        match message.role() {
            MessageRole::User => PromptMessage::User {
                content: message.content().to_string(),
            },
            MessageRole::Assistant => PromptMessage::Assistant {
                content: message.content().to_string(),
                tool_calls: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<PromptMessage>,
    pub tools: Vec<ToolSchema>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl CompletionRequest {
    /// Text of the most recent user entry, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            PromptMessage::User { content } => Some(content.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        let text = content.into();
        let tokens = text.len() / 4; // Rough estimate
        Self {
            text,
            tool_calls: vec![],
            usage: TokenUsage {
                prompt_tokens: 0,
                completion_tokens: tokens,
                total_tokens: tokens,
            },
        }
    }

    pub fn with_tools(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// A reasoning backend: given an exchange, returns either a final text or
/// tool-call requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    fn name(&self) -> &str;
}

enum ScriptStep {
    Reply(Completion),
    Fail(String),
}

/// Replays a fixed script of completions and records every request.
/// Used to drive the agent deterministically in tests.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, completion: Completion) -> Self {
        self.lock_script().push_back(ScriptStep::Reply(completion));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.lock_script().push_back(ScriptStep::Fail(message.into()));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<ScriptStep>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        match self.lock_script().pop_front() {
            Some(ScriptStep::Reply(completion)) => Ok(completion),
            Some(ScriptStep::Fail(message)) => Err(RecallError::Provider(message)),
            None => Err(RecallError::Provider("script exhausted".into())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
