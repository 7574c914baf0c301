//! Web search correction.
//!
//! When internal knowledge grades as insufficient or absent, the corrector
//! turns external search results into chunk-shaped evidence. The provider
//! is optional end to end: an unconfigured corrector returns empty results
//! and callers treat that identically to "no web results found."

use std::sync::Arc;

use tracing::{debug, info, warn};

use corag_core::{
    traits::{WebHit, WebSearchProvider},
    types::{Chunk, ChunkKind, ChunkSource},
};

/// Fixed score assigned to web-search evidence. Moderate on purpose: web
/// results rank below strong internal matches but above nothing.
const WEB_RESULT_SCORE: f32 = 0.70;

/// Snippet length bound for the short content field.
const SNIPPET_CHARS: usize = 500;

/// External-search fallback producing chunk-shaped results.
#[derive(Debug, Clone)]
pub struct WebSearchCorrector {
    provider: Option<Arc<dyn WebSearchProvider>>,
}

impl WebSearchCorrector {
    /// Create a corrector over the given provider.
    pub fn new(provider: Arc<dyn WebSearchProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Create a corrector with no provider; every search returns empty.
    #[must_use]
    pub fn disabled() -> Self {
        Self { provider: None }
    }

    /// Whether a provider is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Search the web and shape the hits as evidence chunks.
    ///
    /// Never fails: an absent provider or a provider error both yield an
    /// empty list.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<Chunk> {
        let Some(provider) = &self.provider else {
            debug!("web search disabled, returning no results");
            return Vec::new();
        };

        match provider.search(query, max_results).await {
            Ok(hits) => {
                info!(count = hits.len(), "web search returned results");
                hits.iter()
                    .enumerate()
                    .map(|(i, hit)| Self::hit_to_chunk(i, hit))
                    .collect()
            }
            Err(error) => {
                warn!(%error, "web search failed, returning no results");
                Vec::new()
            }
        }
    }

    fn hit_to_chunk(index: usize, hit: &WebHit) -> Chunk {
        let description = hit
            .description
            .clone()
            .unwrap_or_else(|| hit.snippet.clone());
        let snippet: String = hit.snippet.chars().take(SNIPPET_CHARS).collect();

        let mut chunk = Chunk::new(format!("web_{index}_{}", hit.url), snippet)
            .with_full_content(format!("{}\n\n{}", hit.title, description))
            .with_url(hit.url.clone())
            .with_title(hit.title.clone())
            .with_kind(ChunkKind::WebSearch)
            .with_score(WEB_RESULT_SCORE);
        chunk.source = ChunkSource::WebSearch;
        chunk
    }
}
