//! Vector store adapters.

mod qdrant;

pub use qdrant::{QdrantConfig, QdrantVectorStore};
