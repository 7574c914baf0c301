//! Error types for the corag engine.
//!
//! This module provides context-aware error types covering the external
//! services the engine consumes (embedding, vector search, LLM, web search)
//! and the internal stages that orchestrate them.

use thiserror::Error;

/// Core error type for the corag engine.
///
/// Covers every failure condition that can occur while embedding queries,
/// searching the vector index, grading evidence, and generating answers.
#[derive(Error, Debug)]
pub enum CoragError {
    /// I/O related errors (file reading, network operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Embedding generation errors
    #[error("Embedding error: {message}")]
    Embedding {
        /// Detailed error message
        message: String,
    },

    /// Vector store operation errors
    #[error("Vector store error: {message}")]
    VectorStore {
        /// Detailed error message
        message: String,
    },

    /// LLM completion errors
    #[error("LLM error: {message}")]
    Llm {
        /// Detailed error message
        message: String,
    },

    /// External web search errors
    #[error("Web search error: {message}")]
    WebSearch {
        /// Detailed error message
        message: String,
    },

    /// Pipeline execution errors
    #[error("Pipeline error: {message}")]
    Pipeline {
        /// Detailed error message
        message: String,
    },

    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// Detailed error message
        message: String,
    },

    /// Input validation errors
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
    },

    /// Resource not found errors
    #[error("Not found: {resource}")]
    NotFound {
        /// Name of the missing resource
        resource: String,
    },

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Internal engine errors
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },

    /// Generic errors from external dependencies
    #[error("External error: {source}")]
    External {
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },
}

impl CoragError {
    /// Create a new embedding error with a message.
    pub fn embedding<S: Into<String>>(message: S) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a new vector store error with a message.
    pub fn vector_store<S: Into<String>>(message: S) -> Self {
        Self::VectorStore {
            message: message.into(),
        }
    }

    /// Create a new LLM error with a message.
    pub fn llm<S: Into<String>>(message: S) -> Self {
        Self::Llm {
            message: message.into(),
        }
    }

    /// Create a new web search error with a message.
    pub fn web_search<S: Into<String>>(message: S) -> Self {
        Self::WebSearch {
            message: message.into(),
        }
    }

    /// Create a new pipeline error with a message.
    pub fn pipeline<S: Into<String>>(message: S) -> Self {
        Self::Pipeline {
            message: message.into(),
        }
    }

    /// Create a new configuration error with a message.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new validation error with a message.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new not found error with a resource name.
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a new internal error with a message.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new external error from any error that implements `Into<anyhow::Error>`.
    pub fn external<E: Into<anyhow::Error>>(error: E) -> Self {
        Self::External {
            source: error.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Returns `true` for transient errors that might succeed on retry,
    /// such as rate limits or I/O failures.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Io(_))
    }

    /// Check if this error is a client error (4xx-style).
    ///
    /// Returns `true` for errors caused by invalid input or configuration
    /// that won't be fixed by retrying.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Configuration { .. } | Self::NotFound { .. }
        )
    }
}

/// Convert from `anyhow::Error` to `CoragError`.
impl From<anyhow::Error> for CoragError {
    fn from(error: anyhow::Error) -> Self {
        Self::External { source: error }
    }
}

/// Result type alias for convenience.
///
/// This is the standard result type used throughout the corag engine.
pub type Result<T> = std::result::Result<T, CoragError>;
