use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::{RecallError, Result};

/// Descriptor advertised to the reasoning backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool-call request as emitted by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    /// Text fed back to the backend for this result.
    pub fn to_content(&self) -> String {
        match &self.error {
            Some(error) => serde_json::json!({ "error": error }).to_string(),
            None => self.result.to_string(),
        }
    }
}

/// The closed set of tools this agent knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WeatherForecast,
}

impl ToolKind {
    pub const ALL: [ToolKind; 1] = [ToolKind::WeatherForecast];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WeatherForecast => "get_weather_forecast",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn schema(&self) -> ToolSchema {
        match self {
            ToolKind::WeatherForecast => ToolSchema {
                name: self.name().to_string(),
                description: "Get the current temperature in degrees Celsius at a geographic coordinate".to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "latitude": {"type": "number", "description": "Latitude in decimal degrees (-90 to 90)"},
                        "longitude": {"type": "number", "description": "Longitude in decimal degrees (-180 to 180)"}
                    },
                    "required": ["latitude", "longitude"],
                    "additionalProperties": false
                }),
            },
        }
    }

    /// Validates a raw argument payload against this tool's parameter types.
    pub fn decode(&self, arguments: &Value) -> Result<ToolArgs> {
        let invalid = |reason: String| RecallError::ToolArguments {
            tool: self.name().to_string(),
            reason,
        };

        match self {
            ToolKind::WeatherForecast => {
                let args: WeatherArgs = serde_json::from_value(arguments.clone())
                    .map_err(|e| invalid(e.to_string()))?;
                args.validate().map_err(invalid)?;
                Ok(ToolArgs::WeatherForecast(args))
            }
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherArgs {
    pub latitude: f64,
    pub longitude: f64,
}

impl WeatherArgs {
    fn validate(&self) -> std::result::Result<(), String> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} is outside [-90, 90]", self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} is outside [-180, 180]", self.longitude));
        }
        Ok(())
    }
}

/// Decoded, typed arguments; one variant per [`ToolKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    WeatherForecast(WeatherArgs),
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn execute(&self, args: ToolArgs) -> Result<ToolResult>;
}

/// Narrow interface to the external weather-data service.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Current temperature in degrees Celsius.
    async fn current_temperature(&self, latitude: f64, longitude: f64) -> Result<f64>;
}

pub struct WeatherForecastTool {
    source: Arc<dyn WeatherSource>,
}

impl WeatherForecastTool {
    pub fn new(source: Arc<dyn WeatherSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ToolHandler for WeatherForecastTool {
    async fn execute(&self, args: ToolArgs) -> Result<ToolResult> {
        let ToolArgs::WeatherForecast(WeatherArgs { latitude, longitude }) = args;

        match self.source.current_temperature(latitude, longitude).await {
            Ok(temperature) => Ok(ToolResult::success(serde_json::json!({
                "latitude": latitude,
                "longitude": longitude,
                "temperature_c": temperature,
            }))),
            Err(e) => {
                tracing::warn!(tool = %ToolKind::WeatherForecast, error = %e, "weather lookup failed");
                Ok(ToolResult::error(e.to_string()))
            }
        }
    }
}

/// Dispatch table from tool name to handler, fixed once built.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in tool wired to its collaborator.
    pub fn with_weather(source: Arc<dyn WeatherSource>) -> Self {
        let mut tools: HashMap<ToolKind, Arc<dyn ToolHandler>> = HashMap::new();
        tools.insert(ToolKind::WeatherForecast, Arc::new(WeatherForecastTool::new(source)));
        Self { tools }
    }

    pub fn register(&mut self, kind: ToolKind, handler: Arc<dyn ToolHandler>) -> Result<()> {
        if self.tools.contains_key(&kind) {
            return Err(RecallError::InvalidConfig(format!("tool '{}' registered twice", kind)));
        }
        self.tools.insert(kind, handler);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<(ToolKind, Arc<dyn ToolHandler>)> {
        ToolKind::from_name(name)
            .and_then(|kind| self.tools.get(&kind).map(|handler| (kind, Arc::clone(handler))))
            .ok_or_else(|| RecallError::ToolNotFound(name.to_string()))
    }

    /// Descriptors in a stable order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        ToolKind::ALL
            .into_iter()
            .filter(|kind| self.tools.contains_key(kind))
            .map(|kind| kind.schema())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
