use std::sync::Arc;
use anyhow::{bail, Context, Result};
use recall_core::{
    Agent, AgentConfig, LlmProvider, MemoryStore, NoopMemoryStore, SqliteMemoryStore, ToolRegistry,
    TurnOrchestrator,
};
use recall_provider_openai::{OpenAIConfig, OpenAIProvider};
use recall_provider_toy::ToyProvider;
use recall_remote::{Mem0Client, Mem0Config, OpenMeteoClient, WeatherConfig};
use recall_storage::{Storage, StorageConfig};
use crate::config::{resolve_api_key, Args, MemoryKind, ProviderKind};

/// Wires backends, tools and memory into a ready orchestrator. Fails before
/// the first prompt when a required setting is missing.
pub fn prepare_orchestrator(args: &Args) -> Result<TurnOrchestrator> {
    let provider = build_provider(args)?;
    let memory = build_memory(args)?;

    let weather = OpenMeteoClient::new(WeatherConfig {
        base_url: args.weather_url.clone(),
        ..WeatherConfig::default()
    })?;
    let tools = ToolRegistry::with_weather(Arc::new(weather));

    let config = AgentConfig {
        system_prompt: args.system_prompt.clone(),
        max_tool_rounds: args.max_tool_rounds,
        ..AgentConfig::default()
    };

    tracing::info!(
        provider = provider.name(),
        memory = memory.name(),
        user_id = %args.user_id,
        "agent ready"
    );

    Ok(TurnOrchestrator::new(
        Agent::new(config, provider, Arc::new(tools)),
        memory,
    ))
}

fn build_provider(args: &Args) -> Result<Arc<dyn LlmProvider>> {
    match args.provider {
        ProviderKind::Toy => Ok(Arc::new(ToyProvider::new(true))),
        ProviderKind::Openai => {
            let fallback = std::env::var("OPENAI_API_KEY").ok();
            let Some(api_key) = resolve_api_key(args.api_key.clone(), fallback) else {
                bail!("no API key: set BASIC_AGENT_API_KEY or OPENAI_API_KEY, or pass --api-key");
            };
            let config = OpenAIConfig {
                model: args.model.clone(),
                base_url: args.base_url.clone(),
                ..OpenAIConfig::new(api_key)
            };
            Ok(Arc::new(OpenAIProvider::new(config)?))
        }
    }
}

fn build_memory(args: &Args) -> Result<Arc<dyn MemoryStore>> {
    match args.memory {
        MemoryKind::Disabled => Ok(Arc::new(NoopMemoryStore)),
        MemoryKind::Sqlite => {
            let storage = Storage::new(StorageConfig {
                path: args.db.clone(),
                ..StorageConfig::default()
            })
            .with_context(|| format!("failed to open memory database {}", args.db.display()))?;
            Ok(Arc::new(SqliteMemoryStore::new(storage)))
        }
        MemoryKind::Mem0 => {
            let client = Mem0Client::new(Mem0Config {
                base_url: args.mem0_url.clone(),
                api_key: args.mem0_api_key.clone(),
                ..Mem0Config::default()
            })?;
            Ok(Arc::new(client))
        }
    }
}
