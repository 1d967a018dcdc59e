use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecallError {
    #[error("Storage error: {0}")]
    Storage(#[from] recall_storage::StorageError),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    ToolArguments { tool: String, reason: String },

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Tool call limit of {limit} rounds exceeded")]
    MaxToolRounds { limit: usize },

    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: std::time::Duration,
    },

    #[error("Context window out of order: expected {expected} message, got {found}")]
    WindowOrder {
        expected: crate::message::MessageRole,
        found: crate::message::MessageRole,
    },

    #[error("Context window ends with an unanswered user message")]
    UnansweredMessage,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RecallError>;
