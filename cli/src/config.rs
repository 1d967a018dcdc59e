use std::path::PathBuf;
use clap::{Parser, ValueEnum};
use recall_core::{DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_SYSTEM_PROMPT};
use recall_provider_openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use recall_remote::{mem0::DEFAULT_MEM0_URL, weather::DEFAULT_WEATHER_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Openai,
    Toy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MemoryKind {
    Sqlite,
    Mem0,
    #[value(name = "none")]
    Disabled,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "recall")]
#[command(about = "Chat with an assistant that remembers", version)]
pub struct Args {
    /// Reasoning backend
    #[arg(long, env = "RECALL_PROVIDER", value_enum, default_value_t = ProviderKind::Openai)]
    pub provider: ProviderKind,

    #[arg(long, env = "RECALL_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Chat-completions endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Falls back to OPENAI_API_KEY when unset
    #[arg(long, env = "BASIC_AGENT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Owner of long-term memories
    #[arg(long, env = "RECALL_USER_ID", default_value = "default_user")]
    pub user_id: String,

    #[arg(long, env = "RECALL_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Long-term memory backend
    #[arg(long, env = "RECALL_MEMORY", value_enum, default_value_t = MemoryKind::Sqlite)]
    pub memory: MemoryKind,

    /// SQLite database for `--memory sqlite`
    #[arg(long, env = "RECALL_DB", default_value = "recall.db")]
    pub db: PathBuf,

    #[arg(long, env = "MEM0_URL", default_value = DEFAULT_MEM0_URL)]
    pub mem0_url: String,

    #[arg(long, env = "MEM0_API_KEY", hide_env_values = true)]
    pub mem0_api_key: Option<String>,

    #[arg(long, env = "RECALL_WEATHER_URL", default_value = DEFAULT_WEATHER_URL)]
    pub weather_url: String,

    #[arg(long, env = "RECALL_MAX_TOOL_ROUNDS", default_value_t = DEFAULT_MAX_TOOL_ROUNDS)]
    pub max_tool_rounds: usize,

    #[arg(long, env = "RECALL_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

/// The explicit key wins; blank values count as missing.
pub fn resolve_api_key(explicit: Option<String>, fallback: Option<String>) -> Option<String> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .or_else(|| fallback.filter(|k| !k.trim().is_empty()))
}
