//! External web search trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One raw result from an external search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebHit {
    /// Result page title.
    pub title: String,

    /// Short snippet from the page.
    pub snippet: String,

    /// Result URL.
    pub url: String,

    /// Longer description when the provider exposes one (e.g. an
    /// `og:description` meta tag); falls back to the snippet otherwise.
    pub description: Option<String>,
}

/// External search fallback consulted when internal knowledge is
/// insufficient.
///
/// The provider is optional throughout the engine: an unconfigured
/// provider returns empty results, never an error, and callers treat "no
/// web results" identically to "web search disabled."
#[async_trait]
pub trait WebSearchProvider: Send + Sync + std::fmt::Debug {
    /// Search the web, returning at most `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebHit>>;

    /// Get a human-readable name for this provider.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
