//! # Pagelens: Page-grounded AI Reading Engine
//!
//! Pagelens turns the page a user is reading into grounded, streaming AI
//! assistance: chat answers anchored to the page's own text, retrieval over
//! an on-demand vector index, callable tools, and per-site time budgets.
//!
//! ## Core Concepts
//!
//! - **Messages**: Role-typed conversation entries, including structured
//!   tool results
//! - **Chunking and retrieval**: Character-window chunks, embedded once per
//!   page into a [`index::VectorIndex`] with a lexical fallback
//! - **Grounded turns**: One [`chat::ChatSession`] per page drives
//!   cancellable provider streams with context chosen per provider
//! - **Tools**: A fixed catalog behind [`tools::ToolRegistry`], with
//!   persisted enablement and validated settings
//! - **Actions**: Typed engine-to-host commands dispatched over a channel
//!
//! ## Quick Start
//!
//! ### Running a grounded turn
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pagelens::chat::{ChatSession, TurnRequest};
//! use pagelens::embeddings::MockEmbeddingProvider;
//! use pagelens::message::Message;
//! use pagelens::providers::{Providers, ScriptedChatProvider};
//! use pagelens::storage::MemoryKvStore;
//! use pagelens::tools::ToolRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(ScriptedChatProvider::streaming(
//!     &["The page lists ", "three tiers."],
//!     Duration::ZERO,
//! ));
//! let providers = Providers::new(provider.clone(), provider);
//!
//! let mut session = ChatSession::new(
//!     "Pricing: starter, team, enterprise.",
//!     "https://example.com/pricing",
//!     Arc::new(MockEmbeddingProvider::new()),
//!     providers,
//! );
//!
//! let registry = ToolRegistry::new(MemoryKvStore::shared());
//! registry.initialize().await?;
//!
//! let turn = session
//!     .chat_with_page(
//!         TurnRequest {
//!             messages: vec![Message::user(1, "What plans are there?")],
//!             provider: "groq".to_string(),
//!             model: "llama-3.3-70b-versatile".to_string(),
//!             custom_prompt: None,
//!         },
//!         &registry,
//!         CancellationToken::new(),
//!     )
//!     .await?;
//!
//! let (text, _tools, _state) = turn.collect().await;
//! assert_eq!(text, "The page lists three tiers.");
//! # Ok(())
//! # }
//! ```
//!
//! ### Chunking and retrieval
//!
//! ```
//! use pagelens::chunker::ChunkerConfig;
//!
//! let chunks = ChunkerConfig::default().split("short page text");
//! assert_eq!(chunks.len(), 1);
//! ```
//!
//! ## Module Guide
//!
//! - [`message`] - Conversation message types
//! - [`extract`] - HTML to plain-text extraction
//! - [`chunker`] - Character-window text chunking
//! - [`embeddings`] - Embedding providers (Gemini plus a deterministic mock)
//! - [`lexical`] - Token-overlap lexical index with fuzzy matching
//! - [`index`] - Per-page vector index with lexical fallback
//! - [`chat`] - The grounded chat orchestrator and turn lifecycle
//! - [`providers`] - Streaming Gemini/Groq clients and a scripted mock
//! - [`tools`] - Callable tool catalog, registry, and built-ins
//! - [`actions`] - Typed engine-to-host action dispatch
//! - [`timers`] - Per-site time budgets with warning and close actions
//! - [`storage`] - Key-value persistence contract and implementations
//! - [`prefs`] - Quick prompts and instant inputs
//! - [`config`] - Environment-driven credentials and client construction
//! - [`telemetry`] - Tracing subscriber setup

pub mod actions;
pub mod chat;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod index;
pub mod lexical;
pub mod message;
pub mod prefs;
pub mod providers;
pub mod storage;
pub mod telemetry;
pub mod timers;
pub mod tools;
