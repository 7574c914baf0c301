//! LLM completion trait.
//!
//! Every LLM-backed stage (relevance grading, expansion, decomposition,
//! answer generation) calls through this narrow completion interface. The
//! failover pool in the query crate composes several implementations, one
//! per candidate model.

use async_trait::async_trait;

use crate::Result;

/// Per-call completion parameters.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tokens to generate.
    pub max_tokens: usize,

    /// Whether the caller expects a JSON object back. Implementations for
    /// providers with a structured-output mode should enable it; others
    /// may ignore the flag, as callers always parse defensively.
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1024,
            json_mode: false,
        }
    }
}

impl CompletionOptions {
    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request structured JSON output.
    #[must_use]
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

/// A single chat-completion model.
#[async_trait]
pub trait ChatModel: Send + Sync + std::fmt::Debug {
    /// Complete the given prompt and return the raw response text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable, rejects the
    /// request, or returns unusable content.
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;

    /// Name of the model behind this client.
    fn model_name(&self) -> &str;
}
