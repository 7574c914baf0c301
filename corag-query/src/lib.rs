//! Corrective retrieval and query processing for the corag CRAG engine.
//!
//! This crate contains the retrieval-correction loop and the query
//! transformation stages that feed it:
//!
//! - **Relevance Evaluator**: batched LLM grading with a confidence-based
//!   safety downgrade
//! - **Query Expander**: paraphrase generation filtered by embedding
//!   similarity
//! - **Query Decomposer**: multi-intent splitting with comparison-query
//!   protection and a too-complex sentinel
//! - **CRAG Retriever**: the correction state machine (retrieve, grade,
//!   expand, decide, correct, inject)
//! - **Multi-Query Retriever**: fan-out over decomposed sub-queries with
//!   dedup and URL diversity capping
//! - **Web Search Corrector**: optional external fallback
//! - **Answer Generator** and **Pipeline**: grounded generation with
//!   failover and per-stage timing
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use corag_query::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     embedder: Arc<dyn corag_core::traits::Embedder>,
//! #     store: Arc<dyn corag_core::traits::VectorStore>,
//! #     chat: Arc<FailoverChat>,
//! # ) -> corag_core::Result<()> {
//! let retriever = Arc::new(
//!     CragRetriever::builder()
//!         .embedder(embedder)
//!         .vector_store(store)
//!         .chat(Arc::clone(&chat))
//!         .build()?,
//! );
//!
//! let pipeline = RagPipeline::builder()
//!     .retriever(retriever)
//!     .chat(chat)
//!     .build()?;
//!
//! let response = pipeline.run("user-1", "Học phí ngành CNTT là bao nhiêu?").await;
//! println!("{}", response.answer);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod corrector;
pub mod decomposer;
pub mod evaluator;
pub mod expander;
pub mod gate;
pub mod generator;
pub mod llm;
pub mod multi_query;
pub mod pipeline;
pub mod retriever;

mod util;

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::corrector::WebSearchCorrector;
    pub use crate::decomposer::QueryDecomposer;
    pub use crate::evaluator::RelevanceEvaluator;
    pub use crate::expander::QueryExpander;
    pub use crate::gate::SlidingWindowGate;
    pub use crate::generator::AnswerGenerator;
    pub use crate::llm::FailoverChat;
    pub use crate::multi_query::{MultiQueryOutcome, MultiQueryRetriever};
    pub use crate::pipeline::{RagPipeline, RagPipelineBuilder};
    pub use crate::retriever::{CragRetriever, CragRetrieverBuilder};

    // Re-export core types
    pub use corag_core::prelude::*;
}
