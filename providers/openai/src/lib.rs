//! Chat-completions backend with function calling.

use std::fmt;
use std::time::Duration;
use async_trait::async_trait;
use recall_core::{
    error::{RecallError, Result},
    provider::{Completion, CompletionRequest, LlmProvider, PromptMessage, TokenUsage},
    tool::{ToolCall, ToolSchema},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RecallError::InvalidConfig("OpenAI API key is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.config.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request.tools.iter().map(WireTool::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(model = %self.config.model, messages = body.messages.len(), "sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecallError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => RecallError::Provider(format!("authentication failed ({status}): {text}")),
                429 => RecallError::Provider(format!("rate limited: {text}")),
                _ => RecallError::Provider(format!("backend returned {status}: {text}")),
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| RecallError::Provider(format!("malformed response: {e}")))?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RecallError::Provider("malformed response: no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(ToolCall::from)
            .collect();

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: data.usage.map(TokenUsage::from).unwrap_or_default(),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&PromptMessage> for WireMessage {
    fn from(message: &PromptMessage) -> Self {
        let plain = |role, content: &String| WireMessage {
            role,
            content: Some(content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        };

        match message {
            PromptMessage::System { content } => plain("system", content),
            PromptMessage::User { content } => plain("user", content),
            PromptMessage::Assistant { content, tool_calls } => WireMessage {
                role: "assistant",
                content: if content.is_empty() && !tool_calls.is_empty() {
                    None
                } else {
                    Some(content.clone())
                },
                tool_calls: tool_calls.iter().map(WireToolCall::from).collect(),
                tool_call_id: None,
            },
            PromptMessage::Tool { tool_call_id, content } => WireMessage {
                role: "tool",
                content: Some(content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: Some(tool_call_id.clone()),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument object, as a string.
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        let raw = call.function.arguments;
        // Unparsable payloads are kept verbatim so argument decoding rejects them.
        let arguments = if raw.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&raw).unwrap_or(Value::String(raw))
        };

        ToolCall {
            id: call.id,
            name: call.function.name,
            arguments,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolSchema> for WireTool<'a> {
    fn from(schema: &'a ToolSchema) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: &schema.name,
                description: &schema.description,
                parameters: &schema.parameters,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}

impl From<WireUsage> for TokenUsage {
    fn from(usage: WireUsage) -> Self {
        TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::ToolKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAIProvider {
        OpenAIProvider::new(OpenAIConfig {
            base_url: server.uri(),
            ..OpenAIConfig::new("test-key")
        })
        .unwrap()
    }

    fn request(messages: Vec<PromptMessage>) -> CompletionRequest {
        CompletionRequest {
            messages,
            tools: vec![ToolKind::WeatherForecast.schema()],
            temperature: None,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_text_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "Hello"}
                ],
                "tools": [{"type": "function", "function": {"name": "get_weather_forecast"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi there!"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })))
            .mount(&server)
            .await;

        let completion = provider(&server)
            .complete(request(vec![
                PromptMessage::system("You are a helpful assistant."),
                PromptMessage::user("Hello"),
            ]))
            .await
            .unwrap();

        assert_eq!(completion.text, "Hi there!");
        assert!(completion.tool_calls.is_empty());
        assert_eq!(completion.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_tool_call_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "get_weather_forecast",
                            "arguments": "{\"latitude\": 40.7, \"longitude\": -74.0}"
                        }
                    }]
                }}]
            })))
            .mount(&server)
            .await;

        let completion = provider(&server)
            .complete(request(vec![PromptMessage::user("weather?")]))
            .await
            .unwrap();

        assert_eq!(completion.text, "");
        assert_eq!(
            completion.tool_calls,
            vec![ToolCall {
                id: "call_abc".into(),
                name: "get_weather_forecast".into(),
                arguments: json!({"latitude": 40.7, "longitude": -74.0}),
            }]
        );
    }

    #[tokio::test]
    async fn test_tool_round_trip_wire_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "user", "content": "weather?"},
                    {"role": "assistant", "content": null, "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "get_weather_forecast", "arguments": "{\"latitude\":1.0,\"longitude\":2.0}"}
                    }]},
                    {"role": "tool", "tool_call_id": "call_abc", "content": "{\"temperature_c\":9.0}"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "It is 9°C."}}]
            })))
            .mount(&server)
            .await;

        let completion = provider(&server)
            .complete(request(vec![
                PromptMessage::user("weather?"),
                PromptMessage::Assistant {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        id: "call_abc".into(),
                        name: "get_weather_forecast".into(),
                        arguments: json!({"latitude": 1.0, "longitude": 2.0}),
                    }],
                },
                PromptMessage::tool("call_abc", "{\"temperature_c\":9.0}"),
            ]))
            .await
            .unwrap();

        assert_eq!(completion.text, "It is 9°C.");
    }

    #[test]
    fn test_unparsable_arguments_kept_verbatim() {
        let call = ToolCall::from(WireToolCall {
            id: "c".into(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: "get_weather_forecast".into(),
                arguments: "{\"latitude\": ".into(),
            },
        });
        assert_eq!(call.arguments, Value::String("{\"latitude\": ".into()));
    }

    #[tokio::test]
    async fn test_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(request(vec![PromptMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn test_missing_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(request(vec![PromptMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::Provider(msg) if msg.contains("no choices")));
    }

    #[test]
    fn test_empty_key_rejected_and_redacted() {
        assert!(matches!(OpenAIProvider::new(OpenAIConfig::new(" ")), Err(RecallError::InvalidConfig(_))));
        let debug = format!("{:?}", OpenAIConfig::new("sk-secret"));
        assert!(!debug.contains("sk-secret"));
    }
}
