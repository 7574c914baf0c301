//! Embedding generation trait.
//!
//! The engine consumes embeddings through this narrow interface; the model
//! behind it (local or API-hosted) is an external concern.

use async_trait::async_trait;

use crate::Result;

/// Maps text to a fixed-size dense vector.
///
/// Implementations must be deterministic for identical input text: the
/// retriever relies on re-embedding a normalized query producing the same
/// vector across calls.
///
/// # Examples
///
/// ```rust,no_run
/// use corag_core::traits::Embedder;
/// use corag_core::Result;
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct FixedEmbedder;
///
/// #[async_trait]
/// impl Embedder for FixedEmbedder {
///     async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
///         Ok(vec![0.1; 384])
///     }
///
///     fn dimension(&self) -> usize {
///         384
///     }
///
///     fn model_name(&self) -> &str {
///         "fixed-embedder"
///     }
/// }
/// ```
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Generate an embedding for a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails due to model issues,
    /// network problems, or invalid input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// The default implementation embeds sequentially; implementations
    /// backed by batch-capable models should override it.
    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Dimension of the produced vectors.
    fn dimension(&self) -> usize;

    /// Name of the underlying embedding model.
    fn model_name(&self) -> &str;

    /// Get a human-readable name for this embedder.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Check if the embedder is ready to generate embeddings.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
