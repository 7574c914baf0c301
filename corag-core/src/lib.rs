//! # Corag Core
//!
//! Core traits, types, and interfaces for the corag corrective
//! retrieval-augmented generation (CRAG) engine.
//!
//! This crate provides the foundational building blocks shared by the
//! engine crates:
//!
//! - **Data structures**: evidence chunks, graded sets, corrective
//!   actions, retrieval outcomes, and pipeline responses
//! - **Component traits**: `Embedder`, `VectorStore`, `ChatModel`,
//!   `WebSearchProvider`, `RequestGate`
//! - **Configuration**: tunable thresholds and the boost/injection rule
//!   tables, with the empirically chosen defaults
//! - **Error handling**: a single error type with context helpers
//! - **Caching**: the bounded answer cache
//!
//! ## Quick Start
//!
//! ```rust
//! use corag_core::prelude::*;
//!
//! let query = RetrievalQuery::new("Học phí ngành CNTT là bao nhiêu?");
//! assert_eq!(query.top_k_final, 2);
//! ```
//!
//! ## Architecture
//!
//! The core deliberately contains no I/O. External services (embedding,
//! vector search, LLM completion, web search) are consumed through the
//! traits in [`traits`]; `corag-integrations` supplies production
//! implementations and tests supply deterministic stubs.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used types and traits
pub mod prelude;

// Core modules
pub mod cache;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key types at crate root for convenience
pub use error::{CoragError, Result};
pub use types::{
    Chunk, ChunkKind, ChunkSource, CorrectiveAction, Decomposition, GeneratedAnswer, GradeStats,
    GradedChunks, MergeStats, PipelineResponse, RelevanceLabel, RetrievalOutcome, RetrievalQuery,
    SourceRef, StageTimings,
};

// Re-export traits for convenience
pub use traits::*;

/// Version information for the corag core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the corag core library.
pub const NAME: &str = env!("CARGO_PKG_NAME");
