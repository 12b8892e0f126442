//! Embedding providers for the vector index.
//!
//! An [`EmbeddingProvider`] turns text into fixed-dimensionality vectors.
//! The engine ships a Gemini-backed implementation plus a deterministic
//! in-process mock so downstream consumers can exercise retrieval without
//! network access.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output dimensionality requested from the default Gemini configuration.
pub const DEFAULT_DIMENSIONS: usize = 256;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Errors from embedding calls.
///
/// A failure during index build is fatal to that build; a failure while
/// embedding a query surfaces to the caller rather than degrading silently.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The provider could not be reached.
    #[error("embedding request failed: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("embedding provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider's response body did not match the expected shape.
    #[error("malformed embedding response: {0}")]
    Malformed(String),

    /// The provider returned a vector of unexpected dimensionality.
    #[error("expected {expected}-dimensional embedding, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A provider that maps text to fixed-length embedding vectors.
///
/// All vectors returned by one provider instance share the same
/// dimensionality; [`VectorIndex`](crate::index::VectorIndex) relies on this
/// to keep cosine similarity well defined.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// The fixed output dimensionality of this provider.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts in one provider call.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| EmbeddingError::Malformed("empty batch response".into()))
    }
}

// ============================================================================
// Gemini implementation
// ============================================================================

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: EmbedContent,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

#[derive(Serialize)]
struct EmbedPart {
    text: String,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini batch embedding client.
///
/// Issues one `batchEmbedContents` call per [`embed_batch`] invocation,
/// requesting a fixed output dimensionality.
pub struct GeminiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddings {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: GEMINI_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Override the API endpoint, for tests and self-hosted gateways.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the embedding model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", self.model),
                    content: EmbedContent {
                        parts: vec![EmbedPart { text: text.clone() }],
                    },
                    output_dimensionality: self.dimensions,
                })
                .collect(),
        };

        tracing::debug!(model = %self.model, batch = texts.len(), "embedding batch");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        let mut vectors = Vec::with_capacity(parsed.embeddings.len());
        for embedding in parsed.embeddings {
            if embedding.values.len() != self.dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: embedding.values.len(),
                });
            }
            vectors.push(embedding.values);
        }
        Ok(vectors)
    }
}

// ============================================================================
// Deterministic mock
// ============================================================================

/// Deterministic, network-free embedding provider.
///
/// Derives a unit vector from a rolling hash of the input, so identical texts
/// always embed identically and different texts almost never collide. Useful
/// for integration tests and offline development.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    #[must_use]
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        // FNV-style rolling hash reseeded per component.
        let mut vector = Vec::with_capacity(self.dimensions);
        for component in 0..self.dimensions {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ (component as u64).wrapping_mul(0x100_0193);
            for byte in text.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x1000_0000_01b3);
            }
            let scaled = (hash % 2_000_000) as f32 / 1_000_000.0 - 1.0;
            vector.push(scaled);
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}
