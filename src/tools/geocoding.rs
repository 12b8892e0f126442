//! Place-name geocoding backed by the Open-Meteo geocoding API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{Tool, ToolDescriptor, ToolError};

const DEFAULT_ENDPOINT: &str = "https://geocoding-api.open-meteo.com/v1/search";

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: String,
}

/// Resolves a place name to coordinates; pairs with the weather tool.
pub struct GeocodingTool {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for GeocodingTool {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodingTool {
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
impl Tool for GeocodingTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "geocoding".to_string(),
            purpose: "Resolve a place name to latitude/longitude coordinates".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Place name to look up" }
                },
                "required": ["name"]
            }),
        }
    }

    async fn execute(
        &self,
        params: Value,
        _settings: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let name = params["name"]
            .as_str()
            .ok_or_else(|| ToolError::BadParameters("name must be a string".to_string()))?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", name), ("count", "1")])
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

        let parsed: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Http(e.to_string()))?;

        match parsed.results.into_iter().next() {
            Some(hit) => Ok(json!({
                "name": hit.name,
                "country": hit.country,
                "latitude": hit.latitude,
                "longitude": hit.longitude,
            })),
            None => Ok(json!({ "error": format!("no match for {name:?}") })),
        }
    }

    fn render(&self, result: &Value) -> Option<String> {
        if let Some(error) = result["error"].as_str() {
            return Some(format!("Geocoding failed: {error}"));
        }
        Some(format!(
            "{} ({}) at {}, {}",
            result["name"], result["country"], result["latitude"], result["longitude"]
        ))
    }
}
