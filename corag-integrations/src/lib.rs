//! External service integrations for the corag CRAG engine.
//!
//! Production implementations of the component traits defined in
//! `corag-core`:
//!
//! - **Chat models**: [`llm::SiumaiChatModel`] over the unified siumai
//!   provider interface (feature `api`, default)
//! - **Embedders**: [`embedders::ApiEmbedder`] for cloud embedding APIs
//!   (feature `api`, default)
//! - **Vector stores**: [`vector_stores::QdrantVectorStore`] (feature
//!   `qdrant`)
//! - **Web search**: [`web_search::GoogleSearchProvider`] for Google
//!   Programmable Search (always available; unconfigured providers
//!   degrade to disabled)

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "api")]
pub mod embedders;

#[cfg(feature = "api")]
pub mod llm;

#[cfg(feature = "qdrant")]
pub mod vector_stores;

pub mod web_search;

/// Re-export commonly used types.
pub mod prelude {
    #[cfg(feature = "api")]
    pub use crate::embedders::ApiEmbedder;

    #[cfg(feature = "api")]
    pub use crate::llm::SiumaiChatModel;

    #[cfg(feature = "qdrant")]
    pub use crate::vector_stores::{QdrantConfig, QdrantVectorStore};

    pub use crate::web_search::GoogleSearchProvider;
}
