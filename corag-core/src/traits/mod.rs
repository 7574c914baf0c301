//! Component traits for the corag engine.
//!
//! These traits are the seams between the retrieval-correction core and
//! the external services it consumes. Implementations live in
//! `corag-integrations`; tests substitute deterministic stubs.

pub mod embedder;
pub mod gate;
pub mod llm;
pub mod vector_store;
pub mod web_search;

pub use embedder::{cosine_similarity, Embedder};
pub use gate::{GateDecision, RequestGate};
pub use llm::{ChatModel, CompletionOptions};
pub use vector_store::VectorStore;
pub use web_search::{WebHit, WebSearchProvider};
