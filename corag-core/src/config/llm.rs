//! LLM pool configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the failover model pool and answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Candidate models, tried least-failed-first.
    pub model_pool: Vec<String>,

    /// A model is skipped once its consecutive failure count reaches this
    /// ceiling; a success resets the count.
    pub max_failures: u32,

    /// Sampling temperature for answer generation.
    pub temperature: f32,

    /// Token budget for answer generation.
    pub max_tokens: usize,

    /// Whether successful answers are cached.
    pub enable_cache: bool,

    /// Maximum entries held by the response cache.
    pub cache_size: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_pool: vec![
                "llama-3.1-8b-instant".to_string(),
                "llama-3.3-70b-versatile".to_string(),
            ],
            max_failures: 3,
            temperature: 0.3,
            max_tokens: 1024,
            enable_cache: true,
            cache_size: 50,
        }
    }
}
