//! Qdrant-backed vector store.
//!
//! Maps Qdrant point payloads to evidence chunks. The payload schema is
//! the one the knowledge-base indexer writes: `chunk_id`, `content`,
//! `full_content`, `url`, `title`, and `type`.

use async_trait::async_trait;
use std::collections::HashMap;

use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, DeletePointsBuilder, Filter, ScrollPointsBuilder, SearchPointsBuilder, Value,
};
use qdrant_client::{Qdrant, QdrantError};
use tracing::{debug, error, info};

use corag_core::{
    traits::VectorStore,
    types::{Chunk, ChunkKind},
    CoragError, Result,
};

/// Configuration for the Qdrant vector store.
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Qdrant server URL (e.g. `http://localhost:6334`).
    pub url: String,

    /// Collection holding the knowledge-base chunks.
    pub collection_name: String,

    /// Optional API key for Qdrant Cloud.
    pub api_key: Option<String>,
}

impl QdrantConfig {
    /// Create a configuration for the given server and collection.
    pub fn new<S: Into<String>>(url: S, collection_name: S) -> Self {
        Self {
            url: url.into(),
            collection_name: collection_name.into(),
            api_key: None,
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Qdrant vector store implementation.
///
/// # Examples
///
/// ```rust,no_run
/// use corag_integrations::vector_stores::{QdrantConfig, QdrantVectorStore};
/// use corag_core::traits::VectorStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = QdrantConfig::new("http://localhost:6334", "admissions_chunks");
/// let store = QdrantVectorStore::new(config)?;
/// let chunks = store.search(&[0.1; 384], 4).await?;
/// # Ok(())
/// # }
/// ```
pub struct QdrantVectorStore {
    client: Qdrant,
    config: QdrantConfig,
}

impl std::fmt::Debug for QdrantVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantVectorStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QdrantVectorStore {
    /// Connect to Qdrant with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    pub fn new(config: QdrantConfig) -> Result<Self> {
        info!(url = %config.url, collection = %config.collection_name, "connecting to Qdrant");

        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build().map_err(map_qdrant_error)?;

        Ok(Self { client, config })
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &QdrantConfig {
        &self.config
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<Chunk>> {
        debug!(top_k, "searching Qdrant");

        let request = SearchPointsBuilder::new(
            &self.config.collection_name,
            embedding.to_vec(),
            top_k as u64,
        )
        .with_payload(true);

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(map_qdrant_error)?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| payload_to_chunk(&point.payload).map(|c| c.with_score(point.score)))
            .collect())
    }

    async fn fetch_by_chunk_id(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        debug!(chunk_id, "fetching chunk by identifier");

        let request = ScrollPointsBuilder::new(&self.config.collection_name)
            .filter(Filter::must([Condition::matches(
                "chunk_id",
                chunk_id.to_string(),
            )]))
            .limit(1)
            .with_payload(true);

        let response = self.client.scroll(request).await.map_err(map_qdrant_error)?;

        Ok(response
            .result
            .first()
            .and_then(|point| payload_to_chunk(&point.payload)))
    }

    async fn delete_by_field(&self, field: &str, value: &str) -> Result<()> {
        info!(field, value, "deleting points by payload field");

        let request = DeletePointsBuilder::new(&self.config.collection_name)
            .points(Filter::must([Condition::matches(
                field,
                value.to_string(),
            )]));

        self.client
            .delete_points(request)
            .await
            .map_err(map_qdrant_error)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.client.health_check().await.map_err(map_qdrant_error)?;
        Ok(())
    }
}

fn map_qdrant_error(error: QdrantError) -> CoragError {
    error!(%error, "Qdrant operation failed");
    CoragError::vector_store(error.to_string())
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|value| match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    })
}

/// Map a point payload onto a chunk. Points without a chunk identifier
/// are skipped.
fn payload_to_chunk(payload: &HashMap<String, Value>) -> Option<Chunk> {
    let chunk_id = payload_str(payload, "chunk_id")?;
    let content = payload_str(payload, "content").unwrap_or_default();

    let mut chunk = Chunk::new(chunk_id, content);
    chunk.full_content = payload_str(payload, "full_content");
    chunk.url = payload_str(payload, "url");
    chunk.title = payload_str(payload, "title");
    chunk.kind = match payload_str(payload, "type").as_deref() {
        Some("table") => ChunkKind::Table,
        Some("image-description") => ChunkKind::ImageDescription,
        Some("web_search") => ChunkKind::WebSearch,
        _ => ChunkKind::Text,
    };
    Some(chunk)
}
