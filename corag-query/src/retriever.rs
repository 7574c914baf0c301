//! The corrective retrieval state machine.
//!
//! [`CragRetriever`] turns one query into a small, trustworthy evidence
//! set. It retrieves, grades what it found, and then decides: trust the
//! internal knowledge, widen the search with paraphrased queries, or
//! escalate to external web search. A configured keyword fallback layer
//! runs last and can force-include known high-value chunks.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use corag_core::{
    config::{EvaluatorConfig, ExpanderConfig, RetrievalConfig},
    traits::{Embedder, VectorStore, WebSearchProvider},
    types::{Chunk, ChunkSource, CorrectiveAction, GradedChunks, RetrievalOutcome, RetrievalQuery},
    CoragError, Result,
};

use crate::corrector::WebSearchCorrector;
use crate::evaluator::RelevanceEvaluator;
use crate::expander::QueryExpander;
use crate::llm::FailoverChat;

/// Corrective RAG retriever.
///
/// One retrieval call walks these states in order, revisiting none of
/// them except through the expansion branch:
///
/// 1. normalize and embed the query
/// 2. initial vector search (empty result is a terminal state)
/// 3. score boosting and re-ranking
/// 4. relevance grading
/// 5. conditional paraphrase expansion with a concurrent fan-out
/// 6. action decision from the graded buckets
/// 7. correction (refine, web search, or both)
/// 8. truncation and keyword fallback injection
///
/// # Examples
///
/// ```rust,no_run
/// use corag_query::retriever::CragRetriever;
/// use corag_core::prelude::*;
///
/// # async fn example(retriever: CragRetriever) -> Result<()> {
/// let query = RetrievalQuery::new("Học phí ngành CNTT là bao nhiêu?");
/// let outcome = retriever.retrieve(&query).await?;
/// println!("{} chunks via {}", outcome.refined_chunks.len(), outcome.action_taken);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CragRetriever {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    evaluator: RelevanceEvaluator,
    expander: QueryExpander,
    corrector: WebSearchCorrector,
    config: RetrievalConfig,
    time_rewrites: Vec<(Regex, String)>,
}

impl CragRetriever {
    /// Create a retriever from prebuilt components.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a time-rewrite phrase cannot be
    /// compiled into a pattern.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        evaluator: RelevanceEvaluator,
        expander: QueryExpander,
        corrector: WebSearchCorrector,
        config: RetrievalConfig,
    ) -> Result<Self> {
        let replacement = format!("năm {}", config.reference_year);
        let time_rewrites = config
            .time_phrases
            .iter()
            .map(|phrase| {
                Regex::new(&format!(r"\b{}\b", regex::escape(phrase)))
                    .map(|pattern| (pattern, replacement.clone()))
                    .map_err(|e| {
                        CoragError::configuration(format!("bad time phrase {phrase:?}: {e}"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embedder,
            vector_store,
            evaluator,
            expander,
            corrector,
            config,
            time_rewrites,
        })
    }

    /// Create a builder for constructing retrievers.
    #[must_use]
    pub fn builder() -> CragRetrieverBuilder {
        CragRetrieverBuilder::new()
    }

    /// The retrieval configuration in effect.
    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve a refined evidence set for one query.
    #[instrument(skip(self), fields(retriever = "CragRetriever"))]
    pub async fn retrieve(&self, query: &RetrievalQuery) -> Result<RetrievalOutcome> {
        info!(query = %query.text, "starting corrective retrieval");

        let query_vector = self.embed_query(&query.text).await?;
        let initial_candidates = self
            .semantic_search(&query_vector, query.top_k_initial)
            .await?;

        if initial_candidates.is_empty() {
            info!("initial retrieval returned no candidates");
            return Ok(RetrievalOutcome::empty(query.text.clone()));
        }

        let mut graded = self
            .evaluator
            .grade(&query.text, initial_candidates.clone())
            .await;

        let mut expansion_triggered = false;
        if graded.needs_expansion(self.config.min_correct_threshold) {
            info!(
                correct = graded.correct.len(),
                threshold = self.config.min_correct_threshold,
                "insufficient correct evidence, expanding query"
            );
            expansion_triggered = true;

            let discovered = self
                .expansion_fanout(&query.text, &initial_candidates, query.top_k_initial)
                .await;
            debug!(discovered = discovered.len(), "expansion fan-out complete");

            if !discovered.is_empty() {
                let mut all_candidates = initial_candidates;
                all_candidates.extend(discovered);
                // Replaces the earlier grading entirely.
                graded = self.evaluator.grade(&query.text, all_candidates).await;
            }
        }

        let action = graded.decide_action();
        let mut refined = self.apply_correction(&query.text, &graded, action).await;
        refined.truncate(query.top_k_final);
        self.apply_keyword_fallback(&query.text, &mut refined).await;

        Ok(RetrievalOutcome {
            query: query.text.clone(),
            refined_chunks: refined,
            graded_stats: graded.stats(),
            action_taken: action,
            expansion_triggered,
        })
    }

    /// Trim, casefold, and rewrite relative-time phrases to the
    /// configured reference year.
    fn normalize_query(&self, text: &str) -> String {
        let mut normalized = text.trim().to_lowercase();
        for (pattern, replacement) in &self.time_rewrites {
            normalized = pattern
                .replace_all(&normalized, replacement.as_str())
                .into_owned();
        }
        normalized
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let normalized = self.normalize_query(text);
        self.embedder.embed(&normalized).await
    }

    /// Vector search plus score boosting and re-ranking.
    async fn semantic_search(&self, vector: &[f32], top_k: usize) -> Result<Vec<Chunk>> {
        let mut candidates = self.vector_store.search(vector, top_k).await?;
        self.apply_boosts(&mut candidates);
        Ok(candidates)
    }

    /// Apply the first matching boost rule per chunk, then re-sort by
    /// score descending. The sort is stable, so ties keep the original
    /// retrieval order.
    fn apply_boosts(&self, candidates: &mut [Chunk]) {
        for chunk in candidates.iter_mut() {
            let id = chunk.chunk_id.to_lowercase();
            if let Some(rule) = self
                .config
                .boost_rules
                .iter()
                .find(|rule| id.contains(&rule.marker.to_lowercase()))
            {
                chunk.score += rule.bonus;
                chunk.boosted = true;
                debug!(chunk_id = %chunk.chunk_id, bonus = rule.bonus, "boosted chunk score");
            }
        }
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Search each paraphrase variant concurrently and keep chunks not
    /// seen before.
    ///
    /// The fan-out is bounded regardless of variant count, and the only
    /// state shared between in-flight searches is the seen-id set, locked
    /// briefly and never across an await. Per-variant failures are logged
    /// and skipped.
    async fn expansion_fanout(
        &self,
        query_text: &str,
        initial_candidates: &[Chunk],
        top_k: usize,
    ) -> Vec<Chunk> {
        let variants = self
            .expander
            .expand(query_text, self.config.num_expansion_variants, false)
            .await;
        if variants.is_empty() {
            debug!("no usable expansion variants");
            return Vec::new();
        }

        let seen: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(
            initial_candidates
                .iter()
                .map(|chunk| chunk.chunk_id.clone())
                .collect(),
        ));

        let width = self.config.max_concurrent_expansions.max(1);
        let batches: Vec<Vec<Chunk>> = stream::iter(variants)
            .map(|variant| {
                let seen = Arc::clone(&seen);
                async move {
                    match self.search_variant(&variant, top_k).await {
                        Ok(chunks) => {
                            let mut fresh = Vec::new();
                            {
                                let mut guard =
                                    seen.lock().expect("expansion seen set lock poisoned");
                                for chunk in chunks {
                                    if guard.insert(chunk.chunk_id.clone()) {
                                        fresh.push(chunk);
                                    }
                                }
                            }
                            debug!(variant = %variant, kept = fresh.len(), "variant searched");
                            fresh
                        }
                        Err(error) => {
                            warn!(variant = %variant, %error, "expansion variant failed");
                            Vec::new()
                        }
                    }
                }
            })
            .buffer_unordered(width)
            .collect()
            .await;

        batches.into_iter().flatten().collect()
    }

    async fn search_variant(&self, variant: &str, top_k: usize) -> Result<Vec<Chunk>> {
        let vector = self.embed_query(variant).await?;
        self.semantic_search(&vector, top_k).await
    }

    /// Build the evidence set the chosen action calls for.
    async fn apply_correction(
        &self,
        query_text: &str,
        graded: &GradedChunks,
        action: CorrectiveAction,
    ) -> Vec<Chunk> {
        info!(action = %action, "applying correction");
        match action {
            CorrectiveAction::WebSearch => {
                self.corrector
                    .search(query_text, self.config.web_results_on_fallback)
                    .await
            }
            CorrectiveAction::KnowledgeRefinement => {
                let mut correct = graded.correct.clone();
                sort_by_score(&mut correct);
                correct.truncate(self.config.refinement_limit);
                correct
            }
            CorrectiveAction::Hybrid => {
                let mut internal: Vec<Chunk> = graded
                    .correct
                    .iter()
                    .chain(graded.ambiguous.iter())
                    .cloned()
                    .collect();
                sort_by_score(&mut internal);
                internal.truncate(self.config.hybrid_internal_limit);

                let web = self
                    .corrector
                    .search(query_text, self.config.web_results_on_hybrid)
                    .await;
                debug!(
                    internal = internal.len(),
                    web = web.len(),
                    "hybrid correction assembled"
                );
                internal.extend(web);
                internal
            }
            CorrectiveAction::None => Vec::new(),
        }
    }

    /// Deterministic override layer: force-include configured chunks when
    /// the query matches their trigger terms.
    ///
    /// Runs after correction and truncation, so an injection may push the
    /// evidence one element above `top_k_final`. Fetch failures degrade
    /// to no injection.
    async fn apply_keyword_fallback(&self, query_text: &str, refined: &mut Vec<Chunk>) {
        let query_lower = self.normalize_query(query_text);
        let mut existing: HashSet<String> = refined
            .iter()
            .map(|chunk| chunk.chunk_id.to_lowercase())
            .collect();

        for rule in &self.config.inject_rules {
            let triggered = rule
                .triggers
                .iter()
                .any(|trigger| query_lower.contains(&trigger.to_lowercase()));
            if !triggered {
                continue;
            }
            let target = rule.chunk_id.to_lowercase();
            if existing.contains(&target) {
                continue;
            }

            match self.vector_store.fetch_by_chunk_id(&rule.chunk_id).await {
                Ok(Some(mut chunk)) => {
                    chunk.score = 1.0;
                    chunk.source = ChunkSource::FallbackInject;
                    info!(chunk_id = %rule.chunk_id, "injected fallback chunk");
                    refined.insert(0, chunk);
                    existing.insert(target);
                }
                Ok(None) => {
                    debug!(chunk_id = %rule.chunk_id, "fallback chunk not in the index");
                }
                Err(error) => {
                    warn!(chunk_id = %rule.chunk_id, %error, "fallback fetch failed");
                }
            }
        }
    }
}

fn sort_by_score(chunks: &mut [Chunk]) {
    chunks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Builder for creating CRAG retrievers.
#[derive(Debug, Default)]
pub struct CragRetrieverBuilder {
    embedder: Option<Arc<dyn Embedder>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chat: Option<Arc<FailoverChat>>,
    web_search: Option<Arc<dyn WebSearchProvider>>,
    retrieval_config: Option<RetrievalConfig>,
    evaluator_config: Option<EvaluatorConfig>,
    expander_config: Option<ExpanderConfig>,
}

impl CragRetrieverBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the embedder.
    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector store.
    #[must_use]
    pub fn vector_store(mut self, vector_store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(vector_store);
        self
    }

    /// Set the chat model pool used for grading and expansion.
    #[must_use]
    pub fn chat(mut self, chat: Arc<FailoverChat>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Set the optional web search provider.
    #[must_use]
    pub fn web_search(mut self, provider: Arc<dyn WebSearchProvider>) -> Self {
        self.web_search = Some(provider);
        self
    }

    /// Set the retrieval configuration.
    #[must_use]
    pub fn retrieval_config(mut self, config: RetrievalConfig) -> Self {
        self.retrieval_config = Some(config);
        self
    }

    /// Set the evaluator configuration.
    #[must_use]
    pub fn evaluator_config(mut self, config: EvaluatorConfig) -> Self {
        self.evaluator_config = Some(config);
        self
    }

    /// Set the expander configuration.
    #[must_use]
    pub fn expander_config(mut self, config: ExpanderConfig) -> Self {
        self.expander_config = Some(config);
        self
    }

    /// Build the retriever.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a required component is missing.
    pub fn build(self) -> Result<CragRetriever> {
        let embedder = self
            .embedder
            .ok_or_else(|| CoragError::configuration("embedder is required"))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| CoragError::configuration("vector store is required"))?;
        let chat = self
            .chat
            .ok_or_else(|| CoragError::configuration("chat model pool is required"))?;

        let evaluator =
            RelevanceEvaluator::new(Arc::clone(&chat), self.evaluator_config.unwrap_or_default());
        let expander = QueryExpander::new(
            chat,
            Arc::clone(&embedder),
            self.expander_config.unwrap_or_default(),
        );
        let corrector = match self.web_search {
            Some(provider) => WebSearchCorrector::new(provider),
            None => WebSearchCorrector::disabled(),
        };

        CragRetriever::new(
            embedder,
            vector_store,
            evaluator,
            expander,
            corrector,
            self.retrieval_config.unwrap_or_default(),
        )
    }
}
