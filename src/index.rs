//! In-memory vector index with lexical fallback.
//!
//! The index owns the embedded chunk set for one page session. Queries run
//! a deterministic two-stage contract: cosine similarity against every
//! stored embedding first, and when nothing clears the threshold, a fuzzy
//! lexical lookup over the same chunk texts. The second stage trades
//! precision for availability so the chat orchestrator always receives at
//! least one context string.

use std::sync::Arc;

use crate::chunker::Chunk;
use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::lexical::LexicalIndex;

/// Default cosine similarity threshold for embedding-stage matches.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.9;

/// Tunables for [`VectorIndex`].
///
/// The threshold and fallback arity were fixed constants in earlier
/// renditions of this design; they are surfaced here as configuration.
#[derive(Clone, Copy, Debug)]
pub struct IndexConfig {
    /// Minimum cosine similarity for an embedding-stage match.
    pub similarity_threshold: f32,
    /// Number of lexical candidates returned when the embedding stage
    /// comes up empty.
    pub lexical_fallback_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            lexical_fallback_limit: 1,
        }
    }
}

/// A chunk plus its embedding, owned exclusively by the index.
///
/// All embeddings in one index share the provider's fixed dimensionality.
#[derive(Clone, Debug)]
pub struct IndexedChunk {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Similarity structure for one page's chunk sequence.
///
/// Lifetime equals the page's chat session; a new page means a new build.
/// Build-before-query ordering is the caller's responsibility, which the
/// constructor makes structural: no partially built value can exist.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use pagelens::chunker::ChunkerConfig;
/// use pagelens::embeddings::MockEmbeddingProvider;
/// use pagelens::index::{IndexConfig, VectorIndex};
///
/// # async fn example() -> Result<(), pagelens::embeddings::EmbeddingError> {
/// let embedder = Arc::new(MockEmbeddingProvider::new());
/// let chunks = ChunkerConfig::default().split("page text goes here");
/// let index = VectorIndex::build(chunks, embedder, IndexConfig::default()).await?;
/// let context = index.query("what does the page say?").await?;
/// # Ok(())
/// # }
/// ```
pub struct VectorIndex {
    chunks: Vec<IndexedChunk>,
    lexical: LexicalIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    config: IndexConfig,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunks", &self.chunks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Embed `chunks` in one batched provider call and build the lexical
    /// index over the same texts.
    ///
    /// An embedding failure aborts the build; the caller must rebuild rather
    /// than reuse any partial state (none escapes).
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IndexConfig,
    ) -> Result<Self, EmbeddingError> {
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        let expected = embedder.dimensions();
        for embedding in &embeddings {
            if embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let mut lexical = LexicalIndex::new();
        let indexed: Vec<IndexedChunk> = texts
            .iter()
            .zip(embeddings)
            .map(|(text, embedding)| {
                lexical.add(text.clone());
                IndexedChunk {
                    text: text.clone(),
                    embedding,
                }
            })
            .collect();

        tracing::debug!(chunks = indexed.len(), "vector index built");

        Ok(Self {
            chunks: indexed,
            lexical,
            embedder,
            config,
        })
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Two-stage retrieval for `text`.
    ///
    /// Stage one embeds the query (a hard failure here propagates, it is not
    /// swallowed into the fallback) and returns every chunk whose cosine
    /// similarity clears the threshold, **in original chunk order** rather
    /// than similarity rank. Stage two runs only when stage one matches
    /// nothing: the best lexical candidates, or the leading chunk when no
    /// query token matches anything. A non-empty index therefore always
    /// yields real chunk text; the single empty string survives only for an
    /// index with no chunks at all.
    pub async fn query(&self, text: &str) -> Result<Vec<String>, EmbeddingError> {
        let query_embedding = self.embedder.embed(text).await?;

        let matches: Vec<String> = self
            .chunks
            .iter()
            .filter(|chunk| {
                cosine_similarity(&query_embedding, &chunk.embedding)
                    > self.config.similarity_threshold
            })
            .map(|chunk| chunk.text.clone())
            .collect();

        if !matches.is_empty() {
            tracing::debug!(matches = matches.len(), "embedding-stage hits");
            return Ok(matches);
        }

        let fallback: Vec<String> = self
            .lexical
            .search(text)
            .into_iter()
            .take(self.config.lexical_fallback_limit.max(1))
            .map(|hit| hit.text)
            .collect();

        if fallback.is_empty() {
            // No token matched at all. Still hand back something real.
            if let Some(first) = self.chunks.first() {
                tracing::debug!("no lexical hit; defaulting to leading chunk");
                return Ok(vec![first.text.clone()]);
            }
            return Ok(vec![String::new()]);
        }
        tracing::debug!(hits = fallback.len(), "lexical fallback used");
        Ok(fallback)
    }
}

/// Cosine of the angle between two vectors; 0.0 when either is zero-length.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
