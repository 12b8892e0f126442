use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagelens::chat::{ChatError, ChatSession, TurnEvent, TurnRequest, TurnState};
use pagelens::message::Message;
use pagelens::providers::{ScriptEvent, ScriptedChatProvider};
use pagelens::storage::MemoryKvStore;
use pagelens::tools::{Tool, ToolDescriptor, ToolError, ToolRegistry};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

mod common;
use common::{TableEmbeddings, axis_vector, providers_from};

const DIM: usize = 4;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".to_string(),
            purpose: "Echo parameters back".to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    async fn execute(
        &self,
        params: Value,
        _settings: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        Ok(params)
    }
}

async fn empty_registry() -> ToolRegistry {
    let registry = ToolRegistry::new(MemoryKvStore::shared());
    registry.initialize().await.unwrap();
    registry
}

async fn registry_with_enabled_echo() -> ToolRegistry {
    let mut registry = ToolRegistry::new(MemoryKvStore::shared());
    registry.register(Arc::new(EchoTool)).unwrap();
    registry.initialize().await.unwrap();
    registry.enable_tool("echo", true).await.unwrap();
    registry
}

fn session_with(provider: Arc<ScriptedChatProvider>, page_text: &str) -> ChatSession {
    ChatSession::new(
        page_text,
        "https://example.com/page",
        Arc::new(
            TableEmbeddings::new(DIM)
                .with(page_text, axis_vector(DIM, 0))
                .with("question", axis_vector(DIM, 0)),
        ),
        providers_from(provider),
    )
}

fn request(provider: &str, model: &str, text: &str) -> TurnRequest {
    TurnRequest {
        messages: vec![Message::user(1, text)],
        provider: provider.to_string(),
        model: model.to_string(),
        custom_prompt: None,
    }
}

#[tokio::test]
async fn unknown_provider_is_rejected_before_any_call() {
    let provider = Arc::new(ScriptedChatProvider::streaming(&["hi"], Duration::ZERO));
    let mut session = session_with(Arc::clone(&provider), "page text");
    let registry = empty_registry().await;

    let err = session
        .chat_with_page(
            request("openai", "gpt-4o", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::InvalidProvider(_)));
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn tokens_stream_in_order_and_turn_completes() {
    let provider = Arc::new(ScriptedChatProvider::streaming(
        &["The answer ", "is ", "42."],
        Duration::ZERO,
    ));
    let mut session = session_with(Arc::clone(&provider), "page text");
    let registry = empty_registry().await;

    let turn = session
        .chat_with_page(
            request("groq", "llama-3.3-70b-versatile", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let (text, outcomes, state) = turn.collect().await;
    assert_eq!(text, "The answer is 42.");
    assert!(outcomes.is_empty());
    assert_eq!(state, TurnState::Completed);
}

#[tokio::test]
async fn cancellation_mid_stream_ends_the_turn() {
    let provider = Arc::new(ScriptedChatProvider::streaming(
        &["one ", "two ", "three ", "four ", "five"],
        Duration::from_millis(80),
    ));
    let mut session = session_with(provider, "page text");
    let registry = empty_registry().await;
    let cancel = CancellationToken::new();

    let mut turn = session
        .chat_with_page(
            request("groq", "llama-3.3-70b-versatile", "question"),
            &registry,
            cancel.clone(),
        )
        .await
        .unwrap();

    let events = turn.events();
    let mut received = 0usize;
    while let Ok(event) = events.recv_async().await {
        if matches!(event, TurnEvent::Token(_)) {
            received += 1;
        }
        if received == 2 {
            cancel.cancel();
            break;
        }
    }

    assert_eq!(turn.wait().await, TurnState::Cancelled);

    // The driver may have forwarded at most one more token before it saw
    // the cancellation; the tail of the script never arrives.
    let mut total = received;
    while let Ok(event) = events.try_recv() {
        if matches!(event, TurnEvent::Token(_)) {
            total += 1;
        }
    }
    assert!(total < 5, "stream was not cut short: {total} tokens");

    // Cancelling again is a no-op.
    cancel.cancel();
    assert_eq!(turn.wait().await, TurnState::Cancelled);
}

#[tokio::test]
async fn cancel_before_the_first_token_still_terminates() {
    // The first increment only arrives after a long pause; cancelling while
    // the turn is still sending must end it promptly, with no tokens.
    let provider = Arc::new(ScriptedChatProvider::new(vec![
        ScriptEvent::Sleep(Duration::from_secs(30)),
        ScriptEvent::Delta("too late".to_string()),
    ]));
    let mut session = session_with(provider, "page text");
    let registry = empty_registry().await;
    let cancel = CancellationToken::new();

    let turn = session
        .chat_with_page(
            request("groq", "llama-3.3-70b-versatile", "question"),
            &registry,
            cancel.clone(),
        )
        .await
        .unwrap();

    cancel.cancel();
    let (text, _, state) = turn.collect().await;
    assert_eq!(state, TurnState::Cancelled);
    assert!(text.is_empty());
}

#[tokio::test]
async fn provider_failure_at_open_becomes_inline_text() {
    let provider = Arc::new(ScriptedChatProvider::failing("rate limit exceeded"));
    let mut session = session_with(provider, "page text");
    let registry = empty_registry().await;

    let turn = session
        .chat_with_page(
            request("groq", "llama-3.3-70b-versatile", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let (text, _, state) = turn.collect().await;
    assert!(text.contains("rate limit exceeded"));
    assert_eq!(state, TurnState::Errored);
}

#[tokio::test]
async fn mid_stream_failure_keeps_earlier_tokens() {
    let provider = Arc::new(ScriptedChatProvider::new(vec![
        ScriptEvent::Delta("partial ".to_string()),
        ScriptEvent::Fail("connection reset".to_string()),
    ]));
    let mut session = session_with(provider, "page text");
    let registry = empty_registry().await;

    let turn = session
        .chat_with_page(
            request("groq", "llama-3.3-70b-versatile", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let (text, _, state) = turn.collect().await;
    assert!(text.starts_with("partial "));
    assert!(text.contains("connection reset"));
    assert_eq!(state, TurnState::Errored);
}

#[tokio::test]
async fn gemini_gets_the_full_page_text() {
    let page = "a page far too specific to retrieve by accident";
    let provider = Arc::new(ScriptedChatProvider::streaming(&["ok"], Duration::ZERO));
    let mut session = session_with(Arc::clone(&provider), page);
    let registry = empty_registry().await;

    session
        .chat_with_page(
            request("gemini", "gemini-2.0-flash", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .collect()
        .await;

    let sent = provider.requests();
    assert!(sent[0].system.contains(page));
    // Full-page grounding never builds the index.
    assert!(!session.has_index());
}

#[tokio::test]
async fn groq_gets_retrieved_context() {
    let page = "the pricing page lists three tiers";
    let provider = Arc::new(ScriptedChatProvider::streaming(&["ok"], Duration::ZERO));
    let mut session = session_with(Arc::clone(&provider), page);
    let registry = empty_registry().await;

    session
        .chat_with_page(
            request("groq", "llama-3.3-70b-versatile", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .collect()
        .await;

    let sent = provider.requests();
    assert!(sent[0].system.contains(page));
    assert!(session.has_index());
}

#[tokio::test]
async fn tool_role_messages_are_stripped_from_history() {
    let provider = Arc::new(ScriptedChatProvider::streaming(&["ok"], Duration::ZERO));
    let mut session = session_with(Arc::clone(&provider), "page text");
    let registry = empty_registry().await;

    let turn_request = TurnRequest {
        messages: vec![
            Message::user(1, "first question"),
            Message::tool(2, json!({"temperature": 21.5})),
            Message::assistant(3, "It's 21.5 degrees."),
            Message::user(4, "question"),
        ],
        provider: "groq".to_string(),
        model: "llama-3.3-70b-versatile".to_string(),
        custom_prompt: None,
    };

    session
        .chat_with_page(turn_request, &registry, CancellationToken::new())
        .await
        .unwrap()
        .collect()
        .await;

    let sent = provider.requests();
    assert_eq!(sent[0].messages.len(), 3);
    assert!(sent[0].messages.iter().all(|m| m.role != "tool"));
}

#[tokio::test]
async fn thinking_models_never_see_tools() {
    let provider = Arc::new(ScriptedChatProvider::streaming(&["ok"], Duration::ZERO));
    let mut session = session_with(Arc::clone(&provider), "page text");
    let registry = registry_with_enabled_echo().await;

    session
        .chat_with_page(
            request("groq", "qwen3-32b-thinking", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .collect()
        .await;
    session
        .chat_with_page(
            request("groq", "llama-3.3-70b-versatile", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .collect()
        .await;

    let sent = provider.requests();
    assert!(sent[0].tools.is_empty());
    assert_eq!(sent[1].tools.len(), 1);
    assert_eq!(sent[1].tools[0].name, "echo");
}

#[tokio::test]
async fn successive_turns_expose_the_same_filtered_tool_set() {
    let provider = Arc::new(ScriptedChatProvider::streaming(&["ok"], Duration::ZERO));
    let mut session = session_with(Arc::clone(&provider), "page text");
    let registry = registry_with_enabled_echo().await;

    for _ in 0..2 {
        session
            .chat_with_page(
                request("groq", "llama-3.3-70b-versatile", "question"),
                &registry,
                CancellationToken::new(),
            )
            .await
            .unwrap()
            .collect()
            .await;
    }

    // Same persisted config, same resolved set, in the same order.
    let sent = provider.requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].tools, sent[1].tools);
    assert_eq!(sent[0].tools.len(), 1);
    assert_eq!(sent[0].tools[0].name, "echo");
}

#[tokio::test]
async fn tool_calls_are_executed_and_reported() {
    let provider = Arc::new(ScriptedChatProvider::new(vec![
        ScriptEvent::ToolCall {
            name: "echo".to_string(),
            arguments: json!({"value": 7}),
        },
        ScriptEvent::Delta("done".to_string()),
    ]));
    let mut session = session_with(provider, "page text");
    let registry = registry_with_enabled_echo().await;

    let turn = session
        .chat_with_page(
            request("groq", "llama-3.3-70b-versatile", "question"),
            &registry,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let (text, outcomes, state) = turn.collect().await;
    assert_eq!(text, "done");
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].tool, "echo");
    assert_eq!(outcomes[0].result, json!({"value": 7}));
    assert_eq!(state, TurnState::Completed);
}

#[tokio::test]
async fn custom_prompt_replaces_default_instructions() {
    let provider = Arc::new(ScriptedChatProvider::streaming(&["ok"], Duration::ZERO));
    let mut session = session_with(Arc::clone(&provider), "page text");
    let registry = empty_registry().await;

    let turn_request = TurnRequest {
        custom_prompt: Some("Answer like a pirate.".to_string()),
        ..request("gemini", "gemini-2.0-flash", "question")
    };
    session
        .chat_with_page(turn_request, &registry, CancellationToken::new())
        .await
        .unwrap()
        .collect()
        .await;

    let sent = provider.requests();
    assert!(sent[0].system.starts_with("Answer like a pirate."));
    assert!(sent[0].system.contains("Page URL: https://example.com/page"));
}
