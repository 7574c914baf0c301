//! Evidence chunk types.
//!
//! A [`Chunk`] is the retrievable unit of knowledge-base text: the payload
//! returned by the vector store or synthesized from web search results,
//! carried through grading, correction, and answer generation.

use serde::{Deserialize, Serialize};

/// Content type of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkKind {
    /// Plain prose extracted from a document.
    #[serde(rename = "text")]
    Text,

    /// Tabular data rendered as text.
    #[serde(rename = "table")]
    Table,

    /// A textual description of an image.
    #[serde(rename = "image-description")]
    ImageDescription,

    /// A result produced by the external web search fallback.
    #[serde(rename = "web_search")]
    WebSearch,
}

impl Default for ChunkKind {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::ImageDescription => "image-description",
            Self::WebSearch => "web_search",
        };
        write!(f, "{label}")
    }
}

/// Where a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkSource {
    /// Retrieved from the vector index.
    Database,

    /// Produced by the web search corrector.
    WebSearch,

    /// Force-included by a keyword fallback rule.
    FallbackInject,
}

impl Default for ChunkSource {
    fn default() -> Self {
        Self::Database
    }
}

/// A retrievable unit of knowledge-base text with its metadata.
///
/// Chunks are created by the vector store (or the web search corrector),
/// mutated in place by the boosting and tagging stages, and discarded at
/// the end of one retrieval call — they are never persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier of the chunk in the knowledge base.
    pub chunk_id: String,

    /// Short text content used for display and as a grading fallback.
    pub content: String,

    /// Longer verbatim text, preferred over `content` for grading and
    /// generation when present.
    pub full_content: Option<String>,

    /// Source URL of the original document, if known.
    pub url: Option<String>,

    /// Human-readable title, if the payload carried one.
    pub title: Option<String>,

    /// Content type of the chunk.
    pub kind: ChunkKind,

    /// Similarity or relevance score. Higher is better; comparable across
    /// chunks from the same retrieval call.
    pub score: f32,

    /// Provenance of the chunk.
    pub source: ChunkSource,

    /// Whether a boost rule raised this chunk's score.
    pub boosted: bool,

    /// The sub-query that retrieved this chunk, tagged by the multi-query
    /// retriever before merging.
    pub source_query: Option<String>,
}

impl Chunk {
    /// Create a new database chunk with the given identifier and content.
    pub fn new(chunk_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            content: content.into(),
            full_content: None,
            url: None,
            title: None,
            kind: ChunkKind::Text,
            score: 0.0,
            source: ChunkSource::Database,
            boosted: false,
            source_query: None,
        }
    }

    /// Set the similarity score.
    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Set the long-form content.
    #[must_use]
    pub fn with_full_content<S: Into<String>>(mut self, full_content: S) -> Self {
        self.full_content = Some(full_content.into());
        self
    }

    /// Set the source URL.
    #[must_use]
    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the title.
    #[must_use]
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_kind(mut self, kind: ChunkKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the provenance.
    #[must_use]
    pub fn with_source(mut self, source: ChunkSource) -> Self {
        self.source = source;
        self
    }

    /// The best available text for grading and generation.
    ///
    /// Prefers `full_content` when present and non-empty.
    #[must_use]
    pub fn best_content(&self) -> &str {
        match &self.full_content {
            Some(full) if !full.is_empty() => full,
            _ => &self.content,
        }
    }

    /// A human-readable title for citation.
    ///
    /// Falls back through: explicit title, humanized chunk identifier,
    /// and finally the given generic label.
    #[must_use]
    pub fn display_title(&self, generic_label: &str) -> String {
        if let Some(title) = &self.title {
            let trimmed = title.trim();
            if !trimmed.is_empty() && trimmed != "None" {
                return trimmed.to_string();
            }
        }
        if !self.chunk_id.is_empty() {
            return humanize_identifier(&self.chunk_id);
        }
        generic_label.to_string()
    }
}

/// Turn a kebab/snake-case identifier into a title-cased label.
fn humanize_identifier(id: &str) -> String {
    id.replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
