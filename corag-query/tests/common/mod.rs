//! Deterministic stand-ins for the external services.
//!
//! The LLM boundary is always scripted: tests verify the control flow
//! around the models, never the models themselves.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use corag_core::prelude::*;
use corag_query::llm::FailoverChat;

/// Chat model that replays canned responses in order and errors once the
/// script runs dry.
#[derive(Debug)]
pub struct ScriptedChat {
    responses: Mutex<VecDeque<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedChat {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(ToString::to_string).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn pool(responses: &[&str]) -> (Arc<FailoverChat>, Arc<Self>) {
        let model = Self::new(responses);
        let chat: Arc<dyn ChatModel> = model.clone();
        (
            Arc::new(FailoverChat::new(vec![chat], 3).expect("non-empty pool")),
            model,
        )
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CoragError::llm("script exhausted"))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Embedder producing a small deterministic vector per text.
#[derive(Debug)]
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let sum: u32 = text.bytes().map(u32::from).sum();
        Ok(vec![
            (sum % 97) as f32 / 97.0,
            (sum % 31) as f32 / 31.0,
            1.0,
        ])
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// Vector store replaying scripted search results per call, with a
/// by-identifier table for fallback fetches.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    searches: Mutex<VecDeque<Vec<Chunk>>>,
    by_id: HashMap<String, Chunk>,
    pub search_calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(searches: Vec<Vec<Chunk>>) -> Self {
        Self {
            searches: Mutex::new(searches.into()),
            by_id: HashMap::new(),
            search_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_chunk(mut self, chunk: Chunk) -> Self {
        self.by_id.insert(chunk.chunk_id.clone(), chunk);
        self
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    async fn search(&self, _embedding: &[f32], top_k: usize) -> Result<Vec<Chunk>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let batch = self
            .searches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(batch.into_iter().take(top_k).collect())
    }

    async fn fetch_by_chunk_id(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        Ok(self.by_id.get(chunk_id).cloned())
    }

    async fn delete_by_field(&self, _field: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}

/// Vector store whose every search fails.
#[derive(Debug)]
pub struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn search(&self, _embedding: &[f32], _top_k: usize) -> Result<Vec<Chunk>> {
        Err(CoragError::vector_store("index unreachable"))
    }

    async fn fetch_by_chunk_id(&self, _chunk_id: &str) -> Result<Option<Chunk>> {
        Err(CoragError::vector_store("index unreachable"))
    }

    async fn delete_by_field(&self, _field: &str, _value: &str) -> Result<()> {
        Err(CoragError::vector_store("index unreachable"))
    }
}

/// Web search provider returning fixed hits.
#[derive(Debug)]
pub struct StaticWeb {
    pub hits: Vec<WebHit>,
}

impl StaticWeb {
    pub fn hit(title: &str, url: &str) -> WebHit {
        WebHit {
            title: title.to_string(),
            snippet: format!("snippet: {title}"),
            url: url.to_string(),
            description: None,
        }
    }
}

#[async_trait]
impl WebSearchProvider for StaticWeb {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebHit>> {
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

/// A database chunk with the given id, score, and url.
pub fn db_chunk(id: &str, score: f32, url: &str) -> Chunk {
    Chunk::new(id, format!("nội dung của {id}"))
        .with_score(score)
        .with_url(url)
}

/// An evaluator response labeling `n` documents identically.
pub fn eval_response(label: &str, confidence: f32, n: usize) -> String {
    let entries: Vec<String> = (0..n)
        .map(|_| format!(r#"{{"label": "{label}", "confidence": {confidence}}}"#))
        .collect();
    format!(r#"{{"evaluations": [{}]}}"#, entries.join(", "))
}
