//! Study aids: mindmap and knowledge-card generation.
//!
//! Both tools ask a chat provider to restructure page text; the mindmap
//! comes back as a mermaid diagram, the cards as question/answer pairs.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Tool, ToolDescriptor, ToolError};
use crate::providers::{ChatProvider, ChatRequest, PromptMessage, collect_text};

const MINDMAP_PROMPT: &str = "Turn the following text into a mermaid mindmap. \
Respond with only the mermaid source, starting with the line `mindmap`, \
no code fences and no commentary.";

const CARDS_PROMPT: &str = "Extract the key facts of the following text as study cards. \
Respond with only a JSON array of objects with \"question\" and \"answer\" string fields.";

fn provider_request(model: &str, system: &str, text: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        system: system.to_string(),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            text: text.to_string(),
        }],
        tools: Vec::new(),
    }
}

fn text_param(params: &Value) -> Result<&str, ToolError> {
    params["text"]
        .as_str()
        .ok_or_else(|| ToolError::BadParameters("text must be a string".to_string()))
}

/// Generates a mermaid mindmap of a passage.
pub struct MindmapTool {
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl MindmapTool {
    #[must_use]
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Tool for MindmapTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "mindmap".to_string(),
            purpose: "Generate a mindmap of a passage of page text".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "The text to map" }
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
        let text = text_param(&params)?;
        let mermaid = collect_text(
            self.provider.as_ref(),
            provider_request(&self.model, MINDMAP_PROMPT, text),
        )
        .await
        .map_err(|e| ToolError::Provider(e.to_string()))?;

        Ok(json!({ "mermaid": mermaid.trim() }))
    }

    fn render(&self, result: &Value) -> Option<String> {
        if let Some(error) = result["error"].as_str() {
            return Some(format!("Mindmap generation failed: {error}"));
        }
        let mermaid = result["mermaid"].as_str()?;
        Some(format!("```mermaid\n{mermaid}\n```"))
    }
}

/// Generates question/answer knowledge cards from a passage.
pub struct KnowledgeCardsTool {
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl KnowledgeCardsTool {
    #[must_use]
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Tool for KnowledgeCardsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "knowledge_cards".to_string(),
            purpose: "Extract question/answer study cards from page text".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "The text to extract cards from" }
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
        let text = text_param(&params)?;
        let raw = collect_text(
            self.provider.as_ref(),
            provider_request(&self.model, CARDS_PROMPT, text),
        )
        .await
        .map_err(|e| ToolError::Provider(e.to_string()))?;

        // Models occasionally wrap the array in a fence despite instructions.
        let trimmed = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let cards: Value = serde_json::from_str(trimmed)
            .map_err(|e| ToolError::Provider(format!("cards were not valid JSON: {e}")))?;

        Ok(json!({ "cards": cards }))
    }

    fn render(&self, result: &Value) -> Option<String> {
        if let Some(error) = result["error"].as_str() {
            return Some(format!("Card extraction failed: {error}"));
        }
        let cards = result["cards"].as_array()?;
        let lines: Vec<String> = cards
            .iter()
            .map(|card| {
                format!(
                    "**Q:** {}\n**A:** {}",
                    card["question"].as_str().unwrap_or_default(),
                    card["answer"].as_str().unwrap_or_default()
                )
            })
            .collect();
        Some(lines.join("\n\n"))
    }
}
