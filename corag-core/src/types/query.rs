//! Query types and normalization.

use serde::{Deserialize, Serialize};

/// A retrieval request: the user's question plus fan-in/fan-out bounds.
///
/// `top_k_initial` controls how many neighbors the first vector search
/// fetches; `top_k_final` bounds the refined evidence set handed to
/// generation.
///
/// # Examples
///
/// ```rust
/// use corag_core::types::RetrievalQuery;
///
/// let query = RetrievalQuery::new("Học phí ngành CNTT là bao nhiêu?")
///     .with_top_k_initial(8)
///     .with_top_k_final(4);
/// assert_eq!(query.top_k_initial, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// The user-supplied query text, unmodified.
    pub text: String,

    /// Number of nearest neighbors to fetch in the initial retrieval.
    pub top_k_initial: usize,

    /// Maximum size of the refined evidence set.
    pub top_k_final: usize,
}

impl RetrievalQuery {
    /// Create a new query with default retrieval bounds.
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            top_k_initial: 4,
            top_k_final: 2,
        }
    }

    /// Set the initial retrieval width.
    #[must_use]
    pub fn with_top_k_initial(mut self, top_k: usize) -> Self {
        self.top_k_initial = top_k;
        self
    }

    /// Set the final evidence bound.
    #[must_use]
    pub fn with_top_k_final(mut self, top_k: usize) -> Self {
        self.top_k_final = top_k;
        self
    }
}
