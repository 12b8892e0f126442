//! Gemini streaming chat client.
//!
//! Speaks the `streamGenerateContent` SSE endpoint: the response body is a
//! sequence of `data: <json>` events separated by blank lines, each carrying
//! candidate parts that are either text deltas or function calls.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChatProvider, ChatRequest, ProviderCallError, ProviderEvent, ProviderStream};
use crate::message::Message;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTools>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "functionCall")]
    FunctionCall { name: String, args: Value },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// SSE-backed Gemini chat client.
pub struct GeminiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiChat {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the API endpoint, for tests and self-hosted gateways.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn convert(request: &ChatRequest) -> GenerateContentRequest {
        let system_instruction = (!request.system.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part::Text(request.system.clone())],
        });

        let contents = request
            .messages
            .iter()
            .map(|message| Content {
                // Gemini calls the assistant role "model".
                role: Some(if message.role == Message::ASSISTANT {
                    "model".to_string()
                } else {
                    "user".to_string()
                }),
                parts: vec![Part::Text(message.text.clone())],
            })
            .collect();

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTools {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|descriptor| FunctionDeclaration {
                        name: descriptor.name.clone(),
                        description: descriptor.purpose.clone(),
                        parameters: descriptor.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        GenerateContentRequest {
            system_instruction,
            contents,
            tools,
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiChat {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ProviderStream, ProviderCallError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?key={}&alt=sse",
            self.base_url, request.model, self.api_key
        );
        let body = Self::convert(&request);

        tracing::debug!(model = %request.model, tools = request.tools.len(), "gemini stream open");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderCallError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(ProviderCallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let stream = async_stream::stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(ProviderCallError::Stream(e.to_string()));
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Complete SSE events are delimited by a blank line.
                while let Some(pos) = buffer.find("\n\n") {
                    let event = buffer[..pos].to_string();
                    buffer = buffer[pos + 2..].to_string();

                    let Some(data) = event.strip_prefix("data: ") else {
                        continue;
                    };
                    if data.trim() == "[DONE]" {
                        continue;
                    }
                    let parsed: StreamChunk = match serde_json::from_str(data) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            yield Err(ProviderCallError::Stream(e.to_string()));
                            continue;
                        }
                    };
                    for candidate in parsed.candidates {
                        let Some(content) = candidate.content else {
                            continue;
                        };
                        for part in content.parts {
                            match part {
                                Part::Text(text) => yield Ok(ProviderEvent::Delta(text)),
                                Part::FunctionCall { name, args } => {
                                    yield Ok(ProviderEvent::ToolCall { name, arguments: args })
                                }
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
