//! Google Programmable Search provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use corag_core::{
    traits::{WebHit, WebSearchProvider},
    CoragError, Result,
};

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
    pagemap: Option<PageMap>,
}

#[derive(Debug, Deserialize)]
struct PageMap {
    #[serde(default)]
    metatags: Vec<HashMap<String, String>>,
}

impl SearchItem {
    /// Prefer the page's `og:description` meta tag over the snippet.
    fn description(&self) -> Option<String> {
        self.pagemap
            .as_ref()
            .and_then(|pagemap| pagemap.metatags.first())
            .and_then(|tags| tags.get("og:description"))
            .cloned()
    }
}

/// Web search over the Google Programmable Search Engine REST API.
///
/// Construct with [`GoogleSearchProvider::from_env`] to get `None` when
/// the credentials are absent; the engine treats a missing provider as
/// "web search disabled" and degrades to empty results.
#[derive(Debug)]
pub struct GoogleSearchProvider {
    http: reqwest::Client,
    api_key: String,
    engine_id: String,
    /// Language restriction passed as `lr` (e.g. `lang_vi`).
    pub language: Option<String>,
    /// Geolocation bias passed as `gl` (e.g. `vn`).
    pub country: Option<String>,
}

impl GoogleSearchProvider {
    /// Create a provider with explicit credentials.
    pub fn new<S: Into<String>>(api_key: S, engine_id: S) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            language: Some("lang_vi".to_string()),
            country: Some("vn".to_string()),
        }
    }

    /// Create a provider from `GOOGLE_API_KEY` and `GOOGLE_CSE_ID`.
    ///
    /// Returns `None` when either variable is unset; callers pass that
    /// straight through as "web search disabled."
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY").ok()?;
        let engine_id = std::env::var("GOOGLE_CSE_ID").ok()?;
        Some(Self::new(api_key, engine_id))
    }
}

#[async_trait]
impl WebSearchProvider for GoogleSearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebHit>> {
        debug!(query, max_results, "querying Google Programmable Search");

        let mut params: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("cx", self.engine_id.clone()),
            ("q", query.to_string()),
            ("num", max_results.to_string()),
        ];
        if let Some(language) = &self.language {
            params.push(("lr", language.clone()));
        }
        if let Some(country) = &self.country {
            params.push(("gl", country.clone()));
        }

        let response = self
            .http
            .get(ENDPOINT)
            .query(&params)
            .send()
            .await
            .map_err(|e| CoragError::web_search(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| CoragError::web_search(format!("search API error: {e}")))?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| CoragError::web_search(format!("malformed response: {e}")))?;

        Ok(parsed
            .items
            .into_iter()
            .take(max_results)
            .map(|item| WebHit {
                description: item.description(),
                title: item.title,
                snippet: item.snippet,
                url: item.link,
            })
            .collect())
    }
}
