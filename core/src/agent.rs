use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::{
    context::ContextWindow,
    error::{RecallError, Result},
    provider::{CompletionRequest, LlmProvider, PromptMessage, TokenUsage},
    tool::{ToolCall, ToolRegistry, ToolResult},
    DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_SYSTEM_PROMPT,
};

const EMPTY_RESPONSE: &str = "I have no response to share.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub system_prompt: String,
    pub temperature: Option<f32>,
    /// Tool-call rounds allowed per turn before the turn is failed.
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

/// Record of one tool invocation made while producing an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolTrace {
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    pub result: ToolResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub text: String,
    pub tool_trace: Vec<ToolTrace>,
    /// Tool-call rounds taken before the final answer.
    pub rounds: usize,
    pub usage: TokenUsage,
}

/// Sends the system instruction, the short-term window and a new user
/// message to the backend, resolving tool calls until a final answer.
pub struct Agent {
    config: AgentConfig,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    pub fn new(config: AgentConfig, provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            provider,
            tools,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn initial_exchange(&self, user_message: &str, window: &ContextWindow) -> Vec<PromptMessage> {
        let mut exchange = Vec::with_capacity(window.len() + 2);
        exchange.push(PromptMessage::system(&self.config.system_prompt));
        exchange.extend(window.messages().map(PromptMessage::from));
        exchange.push(PromptMessage::user(user_message));
        exchange
    }

    /// Runs one exchange. The window is read-only context here; committing
    /// the turn is the caller's job.
    pub async fn run(&self, user_message: &str, window: &ContextWindow) -> Result<RunResult> {
        let mut exchange = self.initial_exchange(user_message, window);
        let tools = self.tools.schemas();
        let mut tool_trace = Vec::new();
        let mut usage = TokenUsage::default();
        let mut rounds = 0;

        loop {
            let request = CompletionRequest {
                messages: exchange.clone(),
                tools: tools.clone(),
                temperature: self.config.temperature,
                max_tokens: None,
            };

            tracing::debug!(
                provider = self.provider.name(),
                messages = request.messages.len(),
                round = rounds,
                "requesting completion"
            );
            let completion = self.provider.complete(request).await?;
            usage.accumulate(&completion.usage);

            if completion.tool_calls.is_empty() {
                let text = if completion.text.trim().is_empty() {
                    EMPTY_RESPONSE.to_string()
                } else {
                    completion.text
                };
                return Ok(RunResult {
                    text,
                    tool_trace,
                    rounds,
                    usage,
                });
            }

            rounds += 1;
            if rounds > self.config.max_tool_rounds {
                tracing::warn!(limit = self.config.max_tool_rounds, "tool call limit exceeded");
                return Err(RecallError::MaxToolRounds {
                    limit: self.config.max_tool_rounds,
                });
            }

            exchange.push(PromptMessage::Assistant {
                content: completion.text.clone(),
                tool_calls: completion.tool_calls.clone(),
            });

            for call in &completion.tool_calls {
                let result = self.invoke_tool(call).await?;
                exchange.push(PromptMessage::tool(call.id.clone(), result.to_content()));
                tool_trace.push(ToolTrace {
                    call_id: call.id.clone(),
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                    result,
                });
            }
        }
    }

    /// Unknown tools and undecodable arguments are errors; failures inside
    /// the tool come back as an error value for the backend to see.
    async fn invoke_tool(&self, call: &ToolCall) -> Result<ToolResult> {
        let (kind, handler) = self.tools.resolve(&call.name)?;
        let args = kind.decode(&call.arguments)?;

        tracing::debug!(tool = %kind, call_id = %call.id, "invoking tool");
        match handler.execute(args).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!(tool = %kind, error = %e, "tool invocation failed");
                Ok(ToolResult::error(e.to_string()))
            }
        }
    }
}
