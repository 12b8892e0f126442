//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use pagelens::embeddings::{EmbeddingError, EmbeddingProvider};
use pagelens::providers::{ChatProvider, Providers};
use rustc_hash::FxHashMap;

/// Embedding provider with a fixed text-to-vector table.
///
/// Texts not in the table get a vector orthogonal to everything in it, so
/// tests can steer exactly which chunks clear a similarity threshold.
pub struct TableEmbeddings {
    dimensions: usize,
    table: FxHashMap<String, Vec<f32>>,
    default: Vec<f32>,
    fail: bool,
}

impl TableEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        let mut default = vec![0.0; dimensions];
        if let Some(last) = default.last_mut() {
            *last = 1.0;
        }
        Self {
            dimensions,
            table: FxHashMap::default(),
            default,
            fail: false,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimensions);
        self.table.insert(text.to_string(), vector);
        self
    }

    /// Every call fails, for exercising hard-failure propagation.
    pub fn failing(dimensions: usize) -> Self {
        let mut provider = Self::new(dimensions);
        provider.fail = true;
        provider
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbeddings {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::Network("embedding backend down".into()));
        }
        Ok(texts
            .iter()
            .map(|text| self.table.get(text).cloned().unwrap_or_else(|| self.default.clone()))
            .collect())
    }
}

/// A unit vector along axis `axis` in `dimensions`-dimensional space.
pub fn axis_vector(dimensions: usize, axis: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimensions];
    vector[axis] = 1.0;
    vector
}

/// Provider set where both slots are backed by the same client.
pub fn providers_from(provider: Arc<dyn ChatProvider>) -> Providers {
    Providers::new(Arc::clone(&provider), provider)
}
