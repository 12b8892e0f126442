//! Callable tool capabilities and their registry.
//!
//! A tool is a named capability the chat model can invoke during a turn:
//! it can describe itself (name, purpose, parameter schema), execute with
//! JSON parameters, and optionally render its result for display. The
//! registry owns the fixed built-in catalog and its persisted per-tool
//! enablement and settings; it is not a plugin system.

pub mod geocoding;
pub mod search;
pub mod study;
pub mod summarize;
pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::storage::{SharedStore, StoreError};

pub use geocoding::GeocodingTool;
pub use search::WebSearchTool;
pub use study::{KnowledgeCardsTool, MindmapTool};
pub use summarize::SummarizeTool;
pub use weather::WeatherTool;

/// Storage key under which all per-tool configuration lives.
const TOOLS_KEY: &str = "tools";

/// Declarative description of a tool, as exposed to chat providers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name; the registry key and the function name on the wire.
    pub name: String,
    /// One-line purpose shown to the model.
    pub purpose: String,
    /// JSON Schema for the execution parameters.
    pub parameters: Value,
}

/// Persisted per-tool configuration.
///
/// Created with `enabled = false` on first run; mutated by the settings
/// surface; read fresh by the orchestrator before every turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
}

/// Failures during a tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid parameters: {0}")]
    BadParameters(String),

    #[error("tool request failed: {0}")]
    Http(String),

    #[error("tool backend returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("provider-backed tool failed: {0}")]
    Provider(String),

    #[error("missing required setting {0:?}")]
    MissingSetting(&'static str),
}

/// Failures from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registration happens once at startup over a fixed catalog; a
    /// collision is a programming error.
    #[error("tool {0:?} is already registered")]
    DuplicateTool(String),

    #[error("unknown tool {0:?}")]
    UnknownTool(String),

    /// Settings rejected before persistence; the tool owns its own shape.
    #[error("settings for tool {name:?} failed validation: {reason}")]
    InvalidSettings { name: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A callable capability: describe, execute, optionally render.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The declarative description handed to chat providers.
    fn descriptor(&self) -> ToolDescriptor;

    /// JSON Schema for this tool's persisted settings, if it has any.
    /// The registry validates [`ToolRegistry::update_tool_settings`]
    /// payloads against it; tools without a schema accept anything.
    fn settings_schema(&self) -> Option<Value> {
        None
    }

    /// Run the tool with JSON `params` and its persisted `settings`.
    async fn execute(
        &self,
        params: Value,
        settings: &Map<String, Value>,
    ) -> Result<Value, ToolError>;

    /// Optional display rendering of a result (markdown). Results with an
    /// `error` field flow through here too, so failures render inline.
    fn render(&self, _result: &Value) -> Option<String> {
        None
    }
}

/// The structured outcome of one tool invocation within a turn.
#[derive(Clone, Debug)]
pub struct ToolOutcome {
    pub tool: String,
    /// The tool's result value; failed executions carry `{"error": "..."}`
    /// here rather than surfacing as an exception.
    pub result: Value,
    pub rendered: Option<String>,
    pub at: DateTime<Utc>,
}

/// A tool bound to its persisted settings, ready for the orchestrator.
#[derive(Clone)]
pub struct BoundTool {
    tool: Arc<dyn Tool>,
    settings: Map<String, Value>,
}

impl BoundTool {
    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        self.tool.descriptor()
    }

    #[must_use]
    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    /// Execute and fold any failure into the outcome's `error` field, so
    /// the result-rendering path is uniform for success and failure.
    pub async fn invoke(&self, params: Value) -> ToolOutcome {
        let name = self.tool.descriptor().name;
        let result = match self.tool.execute(params, &self.settings).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(tool = %name, error = %err, "tool execution failed");
                json!({ "error": err.to_string() })
            }
        };
        let rendered = self.tool.render(&result);
        ToolOutcome {
            tool: name,
            result,
            rendered,
            at: Utc::now(),
        }
    }
}

/// Name-keyed catalog of tools with persisted enablement and settings.
///
/// Registration order is preserved; lookups go through a side map. The
/// persisted state is re-read on every [`get_enabled_tools`] call so a
/// settings change lands on the very next turn (last-write-wins, no locks).
///
/// [`get_enabled_tools`]: ToolRegistry::get_enabled_tools
pub struct ToolRegistry {
    store: SharedStore,
    order: Vec<String>,
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            order: Vec::new(),
            tools: FxHashMap::default(),
        }
    }

    /// Add a tool under its unique name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.descriptor().name;
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Registered tool names, in registration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Look up a registered tool.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Load persisted configuration, seeding disabled defaults on first run.
    pub async fn initialize(&self) -> Result<(), RegistryError> {
        let mut configs = self.load_configs().await?;
        let mut dirty = false;
        for name in &self.order {
            if !configs.contains_key(name) {
                configs.insert(name.clone(), ToolConfig::default());
                dirty = true;
            }
        }
        if dirty {
            self.save_configs(&configs).await?;
        }
        Ok(())
    }

    /// Toggle a tool's enablement.
    pub async fn enable_tool(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        if !self.tools.contains_key(name) {
            return Err(RegistryError::UnknownTool(name.to_string()));
        }
        let mut configs = self.load_configs().await?;
        configs.entry(name.to_string()).or_default().enabled = enabled;
        self.save_configs(&configs).await
    }

    /// Replace a tool's settings after validating them against the tool's
    /// own schema, when it declares one.
    pub async fn update_tool_settings(
        &self,
        name: &str,
        settings: Map<String, Value>,
    ) -> Result<(), RegistryError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;

        if let Some(schema) = tool.settings_schema() {
            let validator = jsonschema::validator_for(&schema).map_err(|err| {
                RegistryError::InvalidSettings {
                    name: name.to_string(),
                    reason: format!("schema is invalid: {err}"),
                }
            })?;
            validator
                .validate(&Value::Object(settings.clone()))
                .map_err(|err| RegistryError::InvalidSettings {
                    name: name.to_string(),
                    reason: err.to_string(),
                })?;
        }

        let mut configs = self.load_configs().await?;
        configs.entry(name.to_string()).or_default().settings = Some(settings);
        self.save_configs(&configs).await
    }

    /// The enabled subset of the catalog, each bound to its persisted
    /// settings, in registration order.
    pub async fn get_enabled_tools(&self) -> Result<Vec<BoundTool>, RegistryError> {
        let configs = self.load_configs().await?;
        let mut enabled = Vec::new();
        for name in &self.order {
            let Some(config) = configs.get(name) else {
                continue;
            };
            if !config.enabled {
                continue;
            }
            if let Some(tool) = self.tools.get(name) {
                enabled.push(BoundTool {
                    tool: Arc::clone(tool),
                    settings: config.settings.clone().unwrap_or_default(),
                });
            }
        }
        Ok(enabled)
    }

    /// Current persisted configuration per tool name.
    pub async fn configs(&self) -> Result<FxHashMap<String, ToolConfig>, RegistryError> {
        self.load_configs().await
    }

    async fn load_configs(&self) -> Result<FxHashMap<String, ToolConfig>, RegistryError> {
        match self.store.get(TOOLS_KEY).await? {
            None => Ok(FxHashMap::default()),
            Some(value) => {
                serde_json::from_value(value).map_err(|e| RegistryError::Store(StoreError::from(e)))
            }
        }
    }

    async fn save_configs(
        &self,
        configs: &FxHashMap<String, ToolConfig>,
    ) -> Result<(), RegistryError> {
        let value =
            serde_json::to_value(configs).map_err(|e| RegistryError::Store(StoreError::from(e)))?;
        self.store.set(TOOLS_KEY, value).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;

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

    fn registry_with_echo() -> ToolRegistry {
        let mut registry = ToolRegistry::new(MemoryKvStore::shared());
        registry.register(Arc::new(EchoTool)).unwrap();
        registry
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = registry_with_echo();
        let err = registry.register(Arc::new(EchoTool)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "echo"));
    }

    #[tokio::test]
    async fn initialize_seeds_disabled_defaults() {
        let registry = registry_with_echo();
        registry.initialize().await.unwrap();
        let configs = registry.configs().await.unwrap();
        assert_eq!(configs["echo"], ToolConfig::default());
        assert!(registry.get_enabled_tools().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enable_exposes_bound_tool() {
        let registry = registry_with_echo();
        registry.initialize().await.unwrap();
        registry.enable_tool("echo", true).await.unwrap();
        let enabled = registry.get_enabled_tools().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].descriptor().name, "echo");
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let registry = registry_with_echo();
        let err = registry.enable_tool("missing", true).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn failed_execution_folds_into_error_field() {
        struct FailingTool;

        #[async_trait]
        impl Tool for FailingTool {
            fn descriptor(&self) -> ToolDescriptor {
                ToolDescriptor {
                    name: "failing".to_string(),
                    purpose: "Always fails".to_string(),
                    parameters: json!({"type": "object"}),
                }
            }

            async fn execute(
                &self,
                _params: Value,
                _settings: &Map<String, Value>,
            ) -> Result<Value, ToolError> {
                Err(ToolError::Http("connection refused".to_string()))
            }
        }

        let bound = BoundTool {
            tool: Arc::new(FailingTool),
            settings: Map::new(),
        };
        let outcome = bound.invoke(json!({})).await;
        assert_eq!(outcome.tool, "failing");
        assert!(
            outcome.result["error"]
                .as_str()
                .unwrap()
                .contains("connection refused")
        );
    }
}
