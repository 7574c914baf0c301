//! API-based embedder using siumai.

use async_trait::async_trait;

use corag_core::{traits::Embedder, CoragError, Result};

use siumai::{
    providers::openai::{OpenAiConfig, OpenAiEmbeddings},
    traits::EmbeddingCapability,
};
use tracing::debug;

/// Cloud embedding client over the siumai embedding capability.
///
/// The engine requires embeddings to be deterministic for identical
/// normalized input; hosted embedding endpoints satisfy this for fixed
/// model versions.
///
/// # Examples
///
/// ```rust,no_run
/// use corag_integrations::embedders::ApiEmbedder;
/// use corag_core::traits::Embedder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let embedder = ApiEmbedder::openai("your-api-key", "text-embedding-3-small", 1536)?;
/// let embedding = embedder.embed("Học phí ngành CNTT là bao nhiêu?").await?;
/// assert_eq!(embedding.len(), 1536);
/// # Ok(())
/// # }
/// ```
pub struct ApiEmbedder {
    client: Box<dyn EmbeddingCapability + Send + Sync>,
    model: String,
    dimension: usize,
}

impl std::fmt::Debug for ApiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEmbedder")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl ApiEmbedder {
    /// Create an embedder against the OpenAI embeddings API.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be
    /// constructed.
    pub fn openai<S: Into<String>>(api_key: &str, model: S, dimension: usize) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| CoragError::configuration(format!("failed to build HTTP client: {e}")))?;

        let config = OpenAiConfig::new(api_key);
        let client = Box::new(OpenAiEmbeddings::new(config, http_client));

        Ok(Self {
            client,
            model: model.into(),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for ApiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(vec![text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| CoragError::embedding("embedding API returned no vectors"))
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        debug!(count = texts.len(), "requesting embeddings");
        let owned: Vec<String> = texts.iter().map(ToString::to_string).collect();
        let response = self
            .client
            .embed(owned)
            .await
            .map_err(|e| CoragError::embedding(format!("embedding request failed: {e}")))?;
        Ok(response.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
