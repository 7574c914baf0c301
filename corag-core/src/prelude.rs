//! Prelude module for convenient imports.
//!
//! Re-exports the most commonly used types and traits from the corag core
//! library.
//!
//! # Examples
//!
//! ```rust
//! use corag_core::prelude::*;
//!
//! let chunk = Chunk::new("hoc-phi-2025", "Học phí năm 2025...");
//! let query = RetrievalQuery::new("Học phí là bao nhiêu?");
//! ```

// Re-export core error types
pub use crate::error::{CoragError, Result};

// Re-export all data types
pub use crate::types::{
    Chunk,
    ChunkKind,
    ChunkSource,
    CorrectiveAction,
    Decomposition,
    GeneratedAnswer,
    GradeStats,
    GradedChunks,
    MergeStats,
    PipelineResponse,
    RelevanceLabel,
    RetrievalOutcome,
    RetrievalQuery,
    SourceRef,
    StageTimings,
};

// Re-export core traits
pub use crate::traits::{
    cosine_similarity, ChatModel, CompletionOptions, Embedder, GateDecision, RequestGate,
    VectorStore, WebHit, WebSearchProvider,
};

// Re-export configuration types
pub use crate::config::{
    BoostRule, DecomposerConfig, EvaluatorConfig, ExpanderConfig, GateConfig, InjectRule,
    LlmConfig, MultiQueryConfig, PipelineConfig, RetrievalConfig,
};

// Re-export the response cache
pub use crate::cache::ResponseCache;
