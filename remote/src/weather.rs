use std::time::Duration;
use async_trait::async_trait;
use recall_core::{
    error::{RecallError, Result},
    tool::WeatherSource,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Current temperature lookup against an Open-Meteo compatible forecast API.
pub struct OpenMeteoClient {
    config: WeatherConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: Option<serde_json::Value>,
}

impl OpenMeteoClient {
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::InvalidConfig(format!("failed to build weather client: {e}")))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn current_temperature(&self, latitude: f64, longitude: f64) -> Result<f64> {
        let url = format!("{}/v1/forecast", self.config.base_url.trim_end_matches('/'));
        tracing::debug!(latitude, longitude, "fetching current temperature");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", "temperature_2m".to_string()),
            ])
            .send()
            .await
            .map_err(|e| RecallError::ToolExecution(format!("weather request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecallError::ToolExecution(format!("weather service returned {status}")));
        }

        let forecast: ForecastResponse = response
            .json()
            .await
            .map_err(|e| RecallError::ToolExecution(format!("malformed weather response: {e}")))?;

        forecast
            .current
            .and_then(|c| c.temperature_2m)
            .and_then(|t| t.as_f64())
            .ok_or_else(|| RecallError::ToolExecution("weather response has no current temperature".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenMeteoClient {
        OpenMeteoClient::new(WeatherConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_reads_current_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "40.7"))
            .and(query_param("longitude", "-74"))
            .and(query_param("current", "temperature_2m"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "latitude": 40.71,
                "longitude": -74.0,
                "current": {"time": "2024-06-01T12:00", "temperature_2m": 22.4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let temperature = client(&server).current_temperature(40.7, -74.0).await.unwrap();
        assert_eq!(temperature, 22.4);
    }

    #[tokio::test]
    async fn test_error_status_is_tool_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).current_temperature(1.0, 2.0).await.unwrap_err();
        assert!(matches!(err, RecallError::ToolExecution(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_missing_or_non_numeric_value_is_tool_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("latitude", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"current": {}})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("latitude", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"current": {"temperature_2m": "warm"}})))
            .mount(&server)
            .await;

        let weather = client(&server);
        assert!(matches!(
            weather.current_temperature(1.0, 0.0).await,
            Err(RecallError::ToolExecution(_))
        ));
        assert!(matches!(
            weather.current_temperature(2.0, 0.0).await,
            Err(RecallError::ToolExecution(_))
        ));
    }

    #[tokio::test]
    async fn test_non_json_body_is_tool_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client(&server).current_temperature(1.0, 2.0).await.unwrap_err();
        assert!(matches!(err, RecallError::ToolExecution(msg) if msg.contains("malformed")));
    }
}
