//! Vector search trait.
//!
//! The engine consumes nearest-neighbor search through this interface; the
//! index behind it is an external service.

use async_trait::async_trait;

use crate::types::Chunk;
use crate::Result;

/// Nearest-neighbor search over the knowledge base.
///
/// Scores are higher-is-better and roughly comparable across calls against
/// the same index.
#[async_trait]
pub trait VectorStore: Send + Sync + std::fmt::Debug {
    /// Return the `top_k` nearest neighbors of the given embedding,
    /// ordered by similarity descending, with payloads mapped to chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails due to connection issues or
    /// an invalid query vector.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<Chunk>>;

    /// Fetch a single chunk directly by its stable identifier.
    ///
    /// Returns `Ok(None)` when no chunk carries the identifier.
    async fn fetch_by_chunk_id(&self, chunk_id: &str) -> Result<Option<Chunk>>;

    /// Delete every point whose payload field matches the given value.
    async fn delete_by_field(&self, field: &str, value: &str) -> Result<()>;

    /// Get a human-readable name for this store.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Check if the store is reachable and ready to serve queries.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
