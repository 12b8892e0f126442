//! Groq streaming chat client (OpenAI-compatible wire format).
//!
//! Streams `chat/completions` with `stream: true`. Text arrives as
//! `choices[0].delta.content`; tool calls arrive as fragmented
//! `delta.tool_calls` entries whose argument strings must be accumulated
//! until the finish reason reports `tool_calls`.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChatProvider, ChatRequest, ProviderCallError, ProviderEvent, ProviderStream};

const BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Serialize)]
struct CompletionsRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireFunction,
}

#[derive(Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Default)]
struct PendingCall {
    name: String,
    arguments: String,
}

/// SSE-backed Groq chat client.
pub struct GroqChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GroqChat {
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

    fn convert(request: &ChatRequest) -> CompletionsRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: request.system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|message| WireMessage {
            role: message.role.clone(),
            content: message.text.clone(),
        }));

        CompletionsRequest {
            model: request.model.clone(),
            messages,
            stream: true,
            tools: request
                .tools
                .iter()
                .map(|descriptor| WireTool {
                    r#type: "function",
                    function: WireFunction {
                        name: descriptor.name.clone(),
                        description: descriptor.purpose.clone(),
                        parameters: descriptor.parameters.clone(),
                    },
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ChatProvider for GroqChat {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ProviderStream, ProviderCallError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::convert(&request);

        tracing::debug!(model = %request.model, tools = request.tools.len(), "groq stream open");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderCallError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderCallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let stream = async_stream::stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut pending: Vec<PendingCall> = Vec::new();

            while let Some(chunk) = bytes_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(ProviderCallError::Stream(e.to_string()));
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

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

                    for choice in parsed.choices {
                        if let Some(text) = choice.delta.content {
                            if !text.is_empty() {
                                yield Ok(ProviderEvent::Delta(text));
                            }
                        }
                        for fragment in choice.delta.tool_calls {
                            if pending.len() <= fragment.index {
                                pending.resize_with(fragment.index + 1, PendingCall::default);
                            }
                            if let Some(function) = fragment.function {
                                let slot = &mut pending[fragment.index];
                                if let Some(name) = function.name {
                                    slot.name = name;
                                }
                                if let Some(arguments) = function.arguments {
                                    slot.arguments.push_str(&arguments);
                                }
                            }
                        }
                        if choice.finish_reason.as_deref() == Some("tool_calls") {
                            for call in pending.drain(..) {
                                let arguments = serde_json::from_str(&call.arguments)
                                    .unwrap_or(Value::Null);
                                yield Ok(ProviderEvent::ToolCall {
                                    name: call.name,
                                    arguments,
                                });
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
