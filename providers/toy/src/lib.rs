use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use lazy_static::lazy_static;
use recall_core::{
    error::Result,
    provider::{Completion, CompletionRequest, LlmProvider, PromptMessage, TokenUsage},
    tool::{ToolCall, ToolKind},
};
use regex::Regex;
use serde_json::{json, Value};

lazy_static! {
    static ref LATITUDE: Regex =
        Regex::new(r"(?i)\blat(?:itude)?\s*[:=]?\s*(-?\d+(?:\.\d+)?)").expect("static regex");
    static ref LONGITUDE: Regex =
        Regex::new(r"(?i)\b(?:lon|lng|longitude)\s*[:=]?\s*(-?\d+(?:\.\d+)?)").expect("static regex");
}

const MEMORY_HEADER: &str = "Relevant memories:\n";

/// Offline backend. Asks for the weather tool when the user gives
/// coordinates, reports its result, and otherwise acknowledges.
pub struct ToyProvider {
    deterministic: bool,
    call_count: AtomicUsize,
}

impl ToyProvider {
    pub fn new(deterministic: bool) -> Self {
        Self {
            deterministic,
            call_count: AtomicUsize::new(0),
        }
    }
}

fn last_capture(re: &Regex, text: &str) -> Option<f64> {
    re.captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// The user's own words, without any recalled-memory block in front.
fn own_words(message: &str) -> &str {
    if message.starts_with(MEMORY_HEADER) {
        message.split_once("\n\n").map_or(message, |(_, raw)| raw)
    } else {
        message
    }
}

fn coordinates(text: &str) -> Option<(f64, f64)> {
    Some((last_capture(&LATITUDE, text)?, last_capture(&LONGITUDE, text)?))
}

fn usage(request: &CompletionRequest) -> TokenUsage {
    let prompt_tokens = request
        .messages
        .iter()
        .map(|m| match m {
            PromptMessage::System { content }
            | PromptMessage::User { content }
            | PromptMessage::Assistant { content, .. }
            | PromptMessage::Tool { content, .. } => content.len() / 4,
        })
        .sum();
    TokenUsage {
        prompt_tokens,
        completion_tokens: 10,
        total_tokens: prompt_tokens + 10,
    }
}

fn describe_tool_result(content: &str) -> String {
    let value: Value = serde_json::from_str(content).unwrap_or(Value::Null);
    match value.get("temperature_c").and_then(Value::as_f64) {
        Some(temperature) => format!(
            "The current temperature at latitude {}, longitude {} is {}°C.",
            value.get("latitude").cloned().unwrap_or(Value::Null),
            value.get("longitude").cloned().unwrap_or(Value::Null),
            temperature
        ),
        None => {
            let reason = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("the tool returned nothing usable");
            format!("Sorry, I couldn't get the weather right now ({reason}).")
        }
    }
}

#[async_trait]
impl LlmProvider for ToyProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let usage = usage(&request);

        if let Some(PromptMessage::Tool { content, .. }) = request.messages.last() {
            return Ok(Completion::text(describe_tool_result(content)).with_usage(usage));
        }

        let weather_enabled = request
            .tools
            .iter()
            .any(|t| t.name == ToolKind::WeatherForecast.name());
        let user_text = request.last_user_message().unwrap_or_default();

        if weather_enabled {
            if let Some((latitude, longitude)) = coordinates(own_words(user_text)) {
                return Ok(Completion::text("")
                    .with_tools(vec![ToolCall {
                        id: format!("call_{}", count),
                        name: ToolKind::WeatherForecast.name().to_string(),
                        arguments: json!({ "latitude": latitude, "longitude": longitude }),
                    }])
                    .with_usage(usage));
            }
        }

        let text = if self.deterministic {
            "I understand your request. How can I help you further?"
        } else {
            let responses = [
                "I'm here to help. What would you like to know?",
                "Thank you for your message. Let me assist you with that.",
                "That's an interesting point. Could you provide more details?",
                "I understand. Let me think about the best way to help you.",
            ];
            responses[count % responses.len()]
        };

        Ok(Completion::text(text).with_usage(usage))
    }

    fn name(&self) -> &str {
        "toy"
    }
}
