//! Current-weather lookup backed by the Open-Meteo forecast API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{Tool, ToolDescriptor, ToolError};

const DEFAULT_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    wind_speed_10m: f64,
    relative_humidity_2m: f64,
    weather_code: i64,
}

/// Fetches current conditions for a coordinate pair.
///
/// Settings: `units` (`"celsius"` or `"fahrenheit"`, default celsius).
pub struct WeatherTool {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherTool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the API endpoint, for tests.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "weather".to_string(),
            purpose: "Look up the current weather for a latitude/longitude pair".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "latitude": { "type": "number" },
                    "longitude": { "type": "number" }
                },
                "required": ["latitude", "longitude"]
            }),
        }
    }

    fn settings_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "units": { "type": "string", "enum": ["celsius", "fahrenheit"] }
            },
            "additionalProperties": false
        }))
    }

    async fn execute(
        &self,
        params: Value,
        settings: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let latitude = params["latitude"]
            .as_f64()
            .ok_or_else(|| ToolError::BadParameters("latitude must be a number".to_string()))?;
        let longitude = params["longitude"]
            .as_f64()
            .ok_or_else(|| ToolError::BadParameters("longitude must be a number".to_string()))?;
        let units = settings
            .get("units")
            .and_then(Value::as_str)
            .unwrap_or("celsius");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                (
                    "current",
                    "temperature_2m,wind_speed_10m,relative_humidity_2m,weather_code".to_string(),
                ),
                ("temperature_unit", units.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let forecast: ForecastResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Http(e.to_string()))?;

        Ok(json!({
            "latitude": latitude,
            "longitude": longitude,
            "temperature": forecast.current.temperature_2m,
            "wind_speed": forecast.current.wind_speed_10m,
            "humidity": forecast.current.relative_humidity_2m,
            "weather_code": forecast.current.weather_code,
            "units": units,
        }))
    }

    fn render(&self, result: &Value) -> Option<String> {
        if let Some(error) = result["error"].as_str() {
            return Some(format!("Weather lookup failed: {error}"));
        }
        let unit = match result["units"].as_str() {
            Some("fahrenheit") => "°F",
            _ => "°C",
        };
        Some(format!(
            "{}{unit}, wind {} km/h, humidity {}%",
            result["temperature"], result["wind_speed"], result["humidity"]
        ))
    }
}
