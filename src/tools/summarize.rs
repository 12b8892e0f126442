//! Page summarization, backed by a chat provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Tool, ToolDescriptor, ToolError};
use crate::providers::{ChatProvider, ChatRequest, collect_text};

const SUMMARY_PROMPT: &str = "Summarize the following text in a few short paragraphs. \
Keep the original language of the text. Lead with the main point.";

/// Summarizes a text with a provider-backed completion.
///
/// Holds its own provider handle and model so the tool works regardless of
/// which provider the surrounding chat turn is using.
pub struct SummarizeTool {
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl SummarizeTool {
    #[must_use]
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Tool for SummarizeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "summarize".to_string(),
            purpose: "Summarize a passage of page text".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "The text to summarize" }
                },
                "required": ["text"]
            }),
        }
    }

    async fn execute(
        &self,
        params: Value,
        _settings: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let text = params["text"]
            .as_str()
            .ok_or_else(|| ToolError::BadParameters("text must be a string".to_string()))?;

        let request = ChatRequest {
            model: self.model.clone(),
            system: SUMMARY_PROMPT.to_string(),
            messages: vec![crate::providers::PromptMessage {
                role: "user".to_string(),
                text: text.to_string(),
            }],
            tools: Vec::new(),
        };

        let summary = collect_text(self.provider.as_ref(), request)
            .await
            .map_err(|e| ToolError::Provider(e.to_string()))?;

        Ok(json!({ "summary": summary }))
    }

    fn render(&self, result: &Value) -> Option<String> {
        if let Some(error) = result["error"].as_str() {
            return Some(format!("Summarization failed: {error}"));
        }
        result["summary"].as_str().map(str::to_string)
    }
}
