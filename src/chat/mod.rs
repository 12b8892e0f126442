//! The grounded chat orchestrator.
//!
//! For one user turn this layer decides the grounding context (full page
//! text for Gemini, retrieved chunks for everything else), assembles the
//! system prompt, resolves the enabled tool set, and drives a cancellable
//! provider stream. Provider failures become inline assistant text rather
//! than errors; cancellation is a normal termination, never a panic or a
//! rejected future.

pub mod prompt;

use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::chunker::ChunkerConfig;
use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::index::{IndexConfig, VectorIndex};
use crate::message::Message;
use crate::providers::{
    ChatProvider, ChatRequest, PromptMessage, ProviderEvent, ProviderKind, Providers,
    UnknownProvider,
};
use crate::tools::{BoundTool, RegistryError, ToolOutcome, ToolRegistry};

/// Model-name suffix that marks a reasoning ("thinking") variant. Thinking
/// models never see tools, an explicit behavioral carve-out.
const THINKING_MODEL_SUFFIX: &str = "-thinking";

/// Whether `model` is a thinking variant that must not receive tools.
#[must_use]
pub fn is_thinking_model(model: &str) -> bool {
    model.ends_with(THINKING_MODEL_SUFFIX)
}

/// Errors surfaced synchronously from [`ChatSession::chat_with_page`].
///
/// Only validation and retrieval failures land here; provider-call failures
/// are folded into the turn's token stream instead.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The provider string fell outside the enumerated set. Checked before
    /// any network call.
    #[error(transparent)]
    InvalidProvider(#[from] UnknownProvider),

    /// Index build or query embedding failed. A hard embedding failure is
    /// surfaced, not silently degraded.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Reading persisted tool configuration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Lifecycle of one conversation turn.
///
/// `Sending` lasts until the first token or failure arrives. `Cancelled` is
/// normally entered from `Streaming`; as a deliberate extension it is also
/// entered directly from `Sending` when the caller cancels before the first
/// increment arrives, so an early cancel never hangs waiting for a token.
/// The three terminal states are left only by starting a brand-new turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Errored,
}

impl TurnState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::Completed | TurnState::Cancelled | TurnState::Errored
        )
    }
}

/// Caller-supplied parameters for one turn.
#[derive(Clone, Debug)]
pub struct TurnRequest {
    /// Conversation history, newest last. Tool-role messages are stripped
    /// before the provider sees it.
    pub messages: Vec<Message>,
    /// Provider identifier; validated against the enumerated set.
    pub provider: String,
    /// Model name within the provider.
    pub model: String,
    /// Replaces the default grounding instructions when set.
    pub custom_prompt: Option<String>,
}

/// An increment delivered over a turn's event channel.
#[derive(Clone, Debug)]
pub enum TurnEvent {
    /// A response-text delta. Deltas are cumulative-safe by appending:
    /// concatenating them in order reconstructs the response so far.
    Token(String),
    /// A completed tool invocation from this turn.
    Tool(ToolOutcome),
}

/// Handle to one in-flight turn: its event channel and watchable state.
///
/// The event sequence is finite and non-restartable; once the channel
/// disconnects the turn has reached a terminal state.
#[derive(Debug)]
pub struct ChatTurn {
    id: Uuid,
    events: flume::Receiver<TurnEvent>,
    state: watch::Receiver<TurnState>,
}

impl ChatTurn {
    /// Identifier of this turn, for logging and reconciliation.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Receiver for this turn's events. Cloneable, but the underlying
    /// sequence is consumed once.
    #[must_use]
    pub fn events(&self) -> flume::Receiver<TurnEvent> {
        self.events.clone()
    }

    /// The turn's current state.
    #[must_use]
    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    /// Wait until the turn reaches a terminal state and return it.
    pub async fn wait(&mut self) -> TurnState {
        loop {
            let current = *self.state.borrow();
            if current.is_terminal() {
                return current;
            }
            if self.state.changed().await.is_err() {
                return *self.state.borrow();
            }
        }
    }

    /// Drain the stream into the concatenated response text, then return it
    /// with the terminal state and any tool outcomes.
    pub async fn collect(mut self) -> (String, Vec<ToolOutcome>, TurnState) {
        let mut text = String::new();
        let mut outcomes = Vec::new();
        while let Ok(event) = self.events.recv_async().await {
            match event {
                TurnEvent::Token(delta) => text.push_str(&delta),
                TurnEvent::Tool(outcome) => outcomes.push(outcome),
            }
        }
        let state = self.wait().await;
        (text, outcomes, state)
    }
}

/// Per-page chat session.
///
/// Owns the page's text and URL plus the single-slot memoized
/// [`VectorIndex`]: lazily built on the first turn that needs retrieval and
/// reused for the session's lifetime. A new page means a new session; there
/// is no hidden process-wide index.
pub struct ChatSession {
    page_text: String,
    page_url: String,
    embedder: Arc<dyn EmbeddingProvider>,
    providers: Providers,
    chunker: ChunkerConfig,
    index_config: IndexConfig,
    index: Option<Arc<VectorIndex>>,
}

impl ChatSession {
    #[must_use]
    pub fn new(
        page_text: impl Into<String>,
        page_url: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        providers: Providers,
    ) -> Self {
        Self {
            page_text: page_text.into(),
            page_url: page_url.into(),
            embedder,
            providers,
            chunker: ChunkerConfig::default(),
            index_config: IndexConfig::default(),
            index: None,
        }
    }

    /// Override the chunking window.
    #[must_use]
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    /// Override retrieval tunables.
    #[must_use]
    pub fn with_index_config(mut self, config: IndexConfig) -> Self {
        self.index_config = config;
        self
    }

    /// Whether the session's index has been built yet.
    #[must_use]
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Build the index if this session does not have one yet.
    ///
    /// Callers must not race two builds for the same session; `&mut self`
    /// makes that structural.
    async fn ensure_index(&mut self) -> Result<Arc<VectorIndex>, EmbeddingError> {
        if let Some(index) = &self.index {
            return Ok(Arc::clone(index));
        }
        let chunks = self.chunker.split(&self.page_text);
        let index = Arc::new(
            VectorIndex::build(chunks, Arc::clone(&self.embedder), self.index_config).await?,
        );
        self.index = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Decide the grounding context for this turn.
    async fn context_for(
        &mut self,
        kind: ProviderKind,
        latest_user_text: &str,
    ) -> Result<String, EmbeddingError> {
        match kind {
            // Gemini's context window takes the whole page; no retrieval.
            ProviderKind::Gemini => Ok(self.page_text.clone()),
            _ => {
                let index = self.ensure_index().await?;
                let hits = index.query(latest_user_text).await?;
                Ok(hits.join("\n\n"))
            }
        }
    }

    /// Run one grounded turn.
    ///
    /// Validation and retrieval failures return `Err` before anything
    /// streams. Everything after that point, including provider failures,
    /// is reported through the returned [`ChatTurn`]: errors arrive as a
    /// final token carrying the error text and an `Errored` terminal state,
    /// and triggering `cancel` ends the stream promptly with `Cancelled`.
    /// The tool set is re-resolved from persisted settings on every call.
    pub async fn chat_with_page(
        &mut self,
        request: TurnRequest,
        registry: &ToolRegistry,
        cancel: CancellationToken,
    ) -> Result<ChatTurn, ChatError> {
        let kind: ProviderKind = request.provider.parse()?;

        let latest_user_text = request
            .messages
            .iter()
            .rev()
            .find(|message| message.has_role(Message::USER))
            .map(|message| message.text().to_string())
            .unwrap_or_default();

        let context = self.context_for(kind, &latest_user_text).await?;
        let system = prompt::assemble(request.custom_prompt.as_deref(), &context, &self.page_url);

        let history: Vec<PromptMessage> = request
            .messages
            .iter()
            .filter(|message| !message.has_role(Message::TOOL))
            .map(|message| PromptMessage {
                role: message.role.clone(),
                text: message.text().to_string(),
            })
            .collect();

        let tools: Vec<BoundTool> = if is_thinking_model(&request.model) {
            Vec::new()
        } else {
            registry.get_enabled_tools().await?
        };

        let provider_request = ChatRequest {
            model: request.model.clone(),
            system,
            messages: history,
            tools: tools.iter().map(BoundTool::descriptor).collect(),
        };

        let turn_id = Uuid::new_v4();
        let (event_tx, event_rx) = flume::unbounded();
        let (state_tx, state_rx) = watch::channel(TurnState::Idle);
        let provider = self.providers.get(kind);

        tracing::debug!(
            turn = %turn_id,
            provider = kind.id(),
            model = %request.model,
            tools = tools.len(),
            "turn started"
        );

        tokio::spawn(drive_turn(
            provider,
            provider_request,
            tools,
            cancel,
            event_tx,
            state_tx,
            turn_id,
        ));

        Ok(ChatTurn {
            id: turn_id,
            events: event_rx,
            state: state_rx,
        })
    }
}

/// Drive one provider stream to a terminal state.
///
/// The cancellation token is checked between stream items, so a triggered
/// token stops the turn before the next increment is forwarded; a cancel
/// that lands while still `Sending` goes straight to `Cancelled`. Triggering
/// the token again, or after natural completion, is a no-op.
async fn drive_turn(
    provider: Arc<dyn ChatProvider>,
    request: ChatRequest,
    tools: Vec<BoundTool>,
    cancel: CancellationToken,
    events: flume::Sender<TurnEvent>,
    state: watch::Sender<TurnState>,
    turn_id: Uuid,
) {
    let _ = state.send(TurnState::Sending);

    let mut stream = match provider.stream_chat(request).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(turn = %turn_id, error = %err, "provider call failed at open");
            let _ = events.send(TurnEvent::Token(err.to_string()));
            let _ = state.send(TurnState::Errored);
            return;
        }
    };

    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(turn = %turn_id, "turn cancelled");
                let _ = state.send(TurnState::Cancelled);
                return;
            }
            item = stream.next() => item,
        };

        match item {
            None => {
                let _ = state.send(TurnState::Completed);
                return;
            }
            Some(Ok(ProviderEvent::Delta(delta))) => {
                if *state.borrow() == TurnState::Sending {
                    let _ = state.send(TurnState::Streaming);
                }
                let _ = events.send(TurnEvent::Token(delta));
            }
            Some(Ok(ProviderEvent::ToolCall { name, arguments })) => {
                if *state.borrow() == TurnState::Sending {
                    let _ = state.send(TurnState::Streaming);
                }
                match tools.iter().find(|tool| tool.descriptor().name == name) {
                    Some(tool) => {
                        let outcome = tool.invoke(arguments).await;
                        let _ = events.send(TurnEvent::Tool(outcome));
                    }
                    None => {
                        tracing::warn!(turn = %turn_id, tool = %name, "model called unknown tool");
                    }
                }
            }
            Some(Err(err)) => {
                tracing::warn!(turn = %turn_id, error = %err, "provider stream failed");
                let _ = events.send(TurnEvent::Token(err.to_string()));
                let _ = state.send(TurnState::Errored);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thinking_models_are_detected_by_suffix() {
        assert!(is_thinking_model("qwen3-32b-thinking"));
        assert!(!is_thinking_model("llama-3.3-70b-versatile"));
        assert!(!is_thinking_model("thinking-of-you"));
    }

    #[test]
    fn terminal_states() {
        assert!(TurnState::Completed.is_terminal());
        assert!(TurnState::Cancelled.is_terminal());
        assert!(TurnState::Errored.is_terminal());
        assert!(!TurnState::Sending.is_terminal());
        assert!(!TurnState::Streaming.is_terminal());
        assert!(!TurnState::Idle.is_terminal());
    }
}
