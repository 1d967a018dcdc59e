pub mod agent;
pub mod context;
pub mod error;
pub mod memory;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod tool;

pub use agent::{Agent, AgentConfig, RunResult, ToolTrace};
pub use context::ContextWindow;
pub use error::{RecallError, Result};
pub use memory::{augment_message, MemoryRecord, MemoryStore, NoopMemoryStore, SqliteMemoryStore};
pub use message::{Message, MessageRole};
pub use orchestrator::{MemoryWrite, OrchestratorConfig, TurnOrchestrator, TurnOutcome};
pub use provider::{Completion, CompletionRequest, LlmProvider, PromptMessage, ScriptedProvider, TokenUsage};
pub use tool::{
    ToolArgs, ToolCall, ToolHandler, ToolKind, ToolRegistry, ToolResult, ToolSchema, WeatherArgs,
    WeatherForecastTool, WeatherSource,
};

/// Short-term window size in messages (5 user/assistant pairs)
pub const DEFAULT_WINDOW_CAPACITY: usize = 10;

/// Long-term memories recalled per turn
pub const DEFAULT_MEMORY_SEARCH_LIMIT: usize = 5;

/// Tool-call rounds allowed per turn
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
