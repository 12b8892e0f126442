//! Scripted chat provider for tests and offline development.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ChatProvider, ChatRequest, ProviderCallError, ProviderEvent, ProviderStream};

/// One step of a [`ScriptedChatProvider`] playback.
#[derive(Clone, Debug)]
pub enum ScriptEvent {
    /// Emit a text delta.
    Delta(String),
    /// Emit a tool-call request.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },
    /// Sleep before the next event, simulating network pacing.
    Sleep(Duration),
    /// Emit a mid-stream failure.
    Fail(String),
}

/// Deterministic provider that plays back a fixed script.
///
/// Every call replays the same script; the requests it receives are recorded
/// for assertion. `fail_on_open` turns the call itself into an error, for
/// exercising the orchestrator's error-as-text path.
pub struct ScriptedChatProvider {
    script: Vec<ScriptEvent>,
    fail_on_open: Option<String>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedChatProvider {
    #[must_use]
    pub fn new(script: Vec<ScriptEvent>) -> Self {
        Self {
            script,
            fail_on_open: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Emit `deltas` in order, with `pause` between consecutive tokens.
    #[must_use]
    pub fn streaming(deltas: &[&str], pause: Duration) -> Self {
        let mut script = Vec::new();
        for (i, delta) in deltas.iter().enumerate() {
            if i > 0 {
                script.push(ScriptEvent::Sleep(pause));
            }
            script.push(ScriptEvent::Delta((*delta).to_string()));
        }
        Self::new(script)
    }

    /// A provider whose every call fails at open with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Vec::new(),
            fail_on_open: Some(message.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests observed so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChatProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ProviderStream, ProviderCallError> {
        self.requests.lock().push(request);

        if let Some(message) = &self.fail_on_open {
            return Err(ProviderCallError::Api {
                status: 429,
                message: message.clone(),
            });
        }

        let script = self.script.clone();
        let stream = async_stream::stream! {
            for event in script {
                match event {
                    ScriptEvent::Delta(text) => yield Ok(ProviderEvent::Delta(text)),
                    ScriptEvent::ToolCall { name, arguments } => {
                        yield Ok(ProviderEvent::ToolCall { name, arguments })
                    }
                    ScriptEvent::Sleep(duration) => tokio::time::sleep(duration).await,
                    ScriptEvent::Fail(message) => {
                        yield Err(ProviderCallError::Stream(message));
                        return;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::collect_text;

    #[tokio::test]
    async fn scripted_playback_concatenates() {
        let provider =
            ScriptedChatProvider::streaming(&["Hello", ", ", "world"], Duration::ZERO);
        let text = collect_text(&provider, ChatRequest::default()).await.unwrap();
        assert_eq!(text, "Hello, world");
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn failing_provider_errors_at_open() {
        let provider = ScriptedChatProvider::failing("rate limit exceeded");
        let err = collect_text(&provider, ChatRequest::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate limit exceeded"));
    }
}
