//! Environment-driven engine configuration.
//!
//! API keys come from the environment (with `.env` support via `dotenvy`);
//! everything else has working defaults. [`EngineConfig::from_env`] is the
//! one place environment variables are read.

use std::sync::Arc;

use thiserror::Error;

use crate::embeddings::GeminiEmbeddings;
use crate::providers::{GeminiChat, GroqChat, Providers};

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Environment variable holding the Groq API key.
pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";

/// Raised when a required environment variable is absent or empty.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required environment variable {0}")]
pub struct MissingEnvVar(pub &'static str);

/// Credentials and client construction for the provider set.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub gemini_api_key: String,
    pub groq_api_key: String,
}

impl EngineConfig {
    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> Result<Self, MissingEnvVar> {
        dotenvy::dotenv().ok();
        Ok(Self {
            gemini_api_key: require(GEMINI_API_KEY_VAR)?,
            groq_api_key: require(GROQ_API_KEY_VAR)?,
        })
    }

    /// Build the provider set from these credentials.
    #[must_use]
    pub fn providers(&self) -> Providers {
        Providers::new(
            Arc::new(GeminiChat::new(&self.gemini_api_key)),
            Arc::new(GroqChat::new(&self.groq_api_key)),
        )
    }

    /// Build the embedding client from these credentials.
    #[must_use]
    pub fn embeddings(&self) -> GeminiEmbeddings {
        GeminiEmbeddings::new(&self.gemini_api_key)
    }
}

fn require(name: &'static str) -> Result<String, MissingEnvVar> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(MissingEnvVar(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_names_itself() {
        let err = MissingEnvVar(GROQ_API_KEY_VAR);
        assert_eq!(
            err.to_string(),
            "missing required environment variable GROQ_API_KEY"
        );
    }
}
