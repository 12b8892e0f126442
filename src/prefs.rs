//! User preference collections persisted in the key-value store.
//!
//! Two small lists ride on top of [`KvStore`]: quick prompts (reusable
//! system-prompt presets for chat turns) and instant inputs (canned user
//! messages surfaced by the composer). Both are whole-list replace on
//! write, matching the host storage surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{SharedStore, StoreError};

const QUICK_PROMPTS_KEY: &str = "quick_prompts";
const INSTANT_INPUTS_KEY: &str = "instant_inputs";

/// A named, reusable system-prompt preset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuickPrompt {
    pub name: String,
    pub prompt: String,
}

/// Preference lists backed by the shared store.
#[derive(Clone)]
pub struct Preferences {
    store: SharedStore,
}

impl Preferences {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// All saved quick prompts, empty when none were ever saved.
    pub async fn quick_prompts(&self) -> Result<Vec<QuickPrompt>, StoreError> {
        self.load(QUICK_PROMPTS_KEY).await
    }

    /// Replace the quick-prompt list.
    pub async fn set_quick_prompts(&self, prompts: &[QuickPrompt]) -> Result<(), StoreError> {
        self.save(QUICK_PROMPTS_KEY, prompts).await
    }

    /// Find a quick prompt by name.
    pub async fn quick_prompt(&self, name: &str) -> Result<Option<QuickPrompt>, StoreError> {
        Ok(self
            .quick_prompts()
            .await?
            .into_iter()
            .find(|prompt| prompt.name == name))
    }

    /// All saved instant inputs, empty when none were ever saved.
    pub async fn instant_inputs(&self) -> Result<Vec<String>, StoreError> {
        self.load(INSTANT_INPUTS_KEY).await
    }

    /// Replace the instant-input list.
    pub async fn set_instant_inputs(&self, inputs: &[String]) -> Result<(), StoreError> {
        self.save(INSTANT_INPUTS_KEY, inputs).await
    }

    async fn load<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        match self.store.get(key).await? {
            None => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    async fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let value: Value = serde_json::to_value(items)?;
        self.store.set(key, value).await
    }
}
