//! Key-value persistence.
//!
//! The host environment exposes a small key-value surface; this module pins
//! down that contract as [`KvStore`] and provides two implementations: an
//! in-memory map for tests and ephemeral sessions, and a JSON-file store for
//! processes that outlive a single run.
//!
//! Keys in use across the engine: `"tools"` (per-tool configuration),
//! `"timer:<domain>"` (per-domain budgets), `"quick_prompts"`, and
//! `"instant_inputs"`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The key-value persistence contract.
///
/// Mirrors the host storage surface: `get`/`set`/`remove` over JSON values
/// plus a full dump. Values are opaque to the store; each consumer owns its
/// own (de)serialization.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
    async fn get_all(&self) -> Result<BTreeMap<String, Value>, StoreError>;
}

/// Convenience alias used throughout the engine.
pub type SharedStore = Arc<dyn KvStore>;

/// In-memory store; contents vanish with the value.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<FxHashMap<String, Value>>,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in the shared handle the rest of the engine takes.
    #[must_use]
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn get_all(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// File-backed store: one JSON object per file, rewritten on every mutation.
///
/// Suitable for the small configuration payloads this engine persists;
/// not a database.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles; tokio Mutex so the guard can be
    // held across the fs await points.
    lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value);
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}
