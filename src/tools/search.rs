//! Web search against a user-configured, SearXNG-compatible endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{Tool, ToolDescriptor, ToolError};

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Queries a search endpoint the user configures in settings.
///
/// Settings: `endpoint` (required), `api_key` (optional bearer token),
/// `max_results` (optional, default 5).
pub struct WebSearchTool {
    client: reqwest::Client,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchTool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "web_search".to_string(),
            purpose: "Search the web and return the top results".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" }
                },
                "required": ["query"]
            }),
        }
    }

    fn settings_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "endpoint": { "type": "string", "format": "uri" },
                "api_key": { "type": "string" },
                "max_results": { "type": "integer", "minimum": 1, "maximum": 20 }
            },
            "required": ["endpoint"],
            "additionalProperties": false
        }))
    }

    async fn execute(
        &self,
        params: Value,
        settings: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let query = params["query"]
            .as_str()
            .ok_or_else(|| ToolError::BadParameters("query must be a string".to_string()))?;
        let endpoint = settings
            .get("endpoint")
            .and_then(Value::as_str)
            .ok_or(ToolError::MissingSetting("endpoint"))?;
        let max_results = settings
            .get("max_results")
            .and_then(Value::as_u64)
            .unwrap_or(5) as usize;

        let mut request = self
            .client
            .get(endpoint)
            .query(&[("q", query), ("format", "json")]);
        if let Some(api_key) = settings.get("api_key").and_then(Value::as_str) {
            request = request.bearer_auth(api_key);
        }

        let response = request
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

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Http(e.to_string()))?;

        let results: Vec<Value> = parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|hit| {
                json!({
                    "title": hit.title,
                    "url": hit.url,
                    "snippet": hit.content,
                })
            })
            .collect();

        Ok(json!({ "query": query, "results": results }))
    }

    fn render(&self, result: &Value) -> Option<String> {
        if let Some(error) = result["error"].as_str() {
            return Some(format!("Search failed: {error}"));
        }
        let results = result["results"].as_array()?;
        let lines: Vec<String> = results
            .iter()
            .map(|hit| format!("- [{}]({})", hit["title"], hit["url"]))
            .collect();
        Some(lines.join("\n"))
    }
}
