//! Chat/completion providers.
//!
//! A [`ChatProvider`] accepts a prompt and returns a finite, non-restartable
//! stream of [`ProviderEvent`]s. The engine ships SSE-backed Gemini and Groq
//! clients plus a scripted mock for tests. Provider selection is a closed
//! enum: any identifier outside it is rejected before a single network call.

pub mod gemini;
pub mod groq;
pub mod mock;

use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use futures_util::StreamExt;
use thiserror::Error;

use crate::tools::ToolDescriptor;

pub use gemini::GeminiChat;
pub use groq::GroqChat;
pub use mock::{ScriptEvent, ScriptedChatProvider};

/// The fixed set of supported chat providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    Groq,
}

impl ProviderKind {
    /// Stable identifier used on the wire and in persisted settings.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
        }
    }
}

/// Raised when a provider string falls outside the enumerated set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown provider {0:?}; expected one of: gemini, groq")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini" => Ok(ProviderKind::Gemini),
            "groq" => Ok(ProviderKind::Groq),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Network/auth/rate-limit failures from a provider call.
#[derive(Debug, Error)]
pub enum ProviderCallError {
    #[error("provider request failed: {0}")]
    Network(String),

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("provider stream broke: {0}")]
    Stream(String),
}

/// A role/text pair as sent to a provider.
///
/// Providers see only plain conversational history; tool-result messages
/// are stripped by the orchestrator before this point.
#[derive(Clone, Debug)]
pub struct PromptMessage {
    pub role: String,
    pub text: String,
}

/// One provider call: system prompt, history, model, and exposed tools.
#[derive(Clone, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<PromptMessage>,
    pub tools: Vec<ToolDescriptor>,
}

/// An increment from a provider's token stream.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderEvent {
    /// A response-text delta. Consumers append increments in order.
    Delta(String),
    /// The model asked for a tool invocation.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },
}

/// The finite, non-restartable event stream of one provider call.
pub type ProviderStream =
    Pin<Box<dyn Stream<Item = Result<ProviderEvent, ProviderCallError>> + Send>>;

/// A provider that accepts a prompt and returns a token stream.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Open a streaming completion. Errors here cover request construction
    /// and connection setup; mid-stream failures arrive as stream items.
    async fn stream_chat(&self, request: ChatRequest) -> Result<ProviderStream, ProviderCallError>;
}

/// The provider set available to the orchestrator, one per [`ProviderKind`].
#[derive(Clone)]
pub struct Providers {
    gemini: Arc<dyn ChatProvider>,
    groq: Arc<dyn ChatProvider>,
}

impl Providers {
    #[must_use]
    pub fn new(gemini: Arc<dyn ChatProvider>, groq: Arc<dyn ChatProvider>) -> Self {
        Self { gemini, groq }
    }

    /// Resolve the client for a kind.
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Arc<dyn ChatProvider> {
        match kind {
            ProviderKind::Gemini => Arc::clone(&self.gemini),
            ProviderKind::Groq => Arc::clone(&self.groq),
        }
    }
}

/// Drive a provider call to completion and return the concatenated text.
///
/// Tool-call events are ignored; used by provider-backed tools (summaries,
/// mindmaps) that want a plain completion.
pub async fn collect_text(
    provider: &dyn ChatProvider,
    request: ChatRequest,
) -> Result<String, ProviderCallError> {
    let mut stream = provider.stream_chat(request).await?;
    let mut text = String::new();
    while let Some(event) = stream.next().await {
        if let ProviderEvent::Delta(delta) = event? {
            text.push_str(&delta);
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_parse() {
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("groq".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = "openai".parse::<ProviderKind>().unwrap_err();
        assert_eq!(err, UnknownProvider("openai".to_string()));
    }

    #[test]
    fn ids_round_trip() {
        for kind in [ProviderKind::Gemini, ProviderKind::Groq] {
            assert_eq!(kind.id().parse::<ProviderKind>().unwrap(), kind);
        }
    }
}
