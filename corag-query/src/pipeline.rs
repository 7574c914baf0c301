//! The top-level pipeline for one user turn.
//!
//! Sequences gate → decomposition → retrieval → generation with per-stage
//! timing capture. The decomposer's too-complex sentinel and the gate's
//! rejections short-circuit before any retrieval or generation cost is
//! paid. Service failures during retrieval degrade to the configured
//! overloaded answer; the underlying error goes to the log.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument};

use corag_core::{
    config::{DecomposerConfig, GateConfig, LlmConfig, MultiQueryConfig, PipelineConfig},
    traits::{GateDecision, RequestGate},
    types::{
        CorrectiveAction, Chunk, Decomposition, GradeStats, MergeStats, PipelineResponse,
        RetrievalQuery, StageTimings,
    },
    CoragError, Result,
};

use crate::decomposer::QueryDecomposer;
use crate::gate::SlidingWindowGate;
use crate::generator::AnswerGenerator;
use crate::llm::FailoverChat;
use crate::multi_query::MultiQueryRetriever;
use crate::retriever::CragRetriever;

/// Evidence and diagnostics from the retrieval stage, either path.
#[derive(Debug)]
struct RetrievedEvidence {
    chunks: Vec<Chunk>,
    graded_stats: Option<GradeStats>,
    merge_stats: Option<MergeStats>,
    action_taken: Option<CorrectiveAction>,
}

/// The complete CRAG pipeline for one user turn.
///
/// # Examples
///
/// ```rust,no_run
/// use corag_query::pipeline::RagPipeline;
///
/// # async fn example(pipeline: RagPipeline) {
/// let response = pipeline.run("user-42", "Học phí ngành CNTT là bao nhiêu?").await;
/// println!("{}", response.answer);
/// # }
/// ```
#[derive(Debug)]
pub struct RagPipeline {
    retriever: Arc<CragRetriever>,
    multi_retriever: MultiQueryRetriever,
    decomposer: QueryDecomposer,
    generator: AnswerGenerator,
    gate: Arc<dyn RequestGate>,
    config: PipelineConfig,
}

impl RagPipeline {
    /// Create a builder for constructing pipelines.
    #[must_use]
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::new()
    }

    /// Answer one user query.
    ///
    /// Infallible by design: every failure mode maps to a user-facing
    /// response (gate rejection reason, too-complex guidance, or the
    /// overloaded message) while diagnostics go to the log.
    #[instrument(skip(self), fields(pipeline = "RagPipeline"))]
    pub async fn run(&self, user_id: &str, query: &str) -> PipelineResponse {
        let start = Instant::now();

        if let GateDecision::Rejected(reason) = self.gate.validate_and_limit(user_id, query) {
            info!(user_id, %reason, "request rejected by gate");
            return Self::rejected_response(query, reason);
        }

        let decompose_start = Instant::now();
        let decomposition = self.decomposer.decompose(query).await;
        let decomposition_time = decompose_start.elapsed();

        if decomposition == Decomposition::TooComplex {
            info!("query too complex, asking the user to narrow it");
            return PipelineResponse {
                query: query.to_string(),
                sub_queries: Vec::new(),
                answer: self.config.too_complex_message.clone(),
                sources: Vec::new(),
                retrieved_chunks: 0,
                graded_stats: None,
                merge_stats: None,
                action_taken: None,
                timings: StageTimings {
                    decomposition: decomposition_time,
                    total: start.elapsed(),
                    ..StageTimings::default()
                },
                too_complex: true,
                rejected: None,
            };
        }

        let sub_queries = decomposition.sub_queries();

        let retrieval_start = Instant::now();
        let evidence = match self.retrieve(&decomposition).await {
            Ok(evidence) => evidence,
            Err(err) => {
                error!(error = %err, "retrieval failed, answering with overloaded message");
                return PipelineResponse {
                    query: query.to_string(),
                    sub_queries,
                    answer: self.config.overloaded_message.clone(),
                    sources: Vec::new(),
                    retrieved_chunks: 0,
                    graded_stats: None,
                    merge_stats: None,
                    action_taken: None,
                    timings: StageTimings {
                        decomposition: decomposition_time,
                        retrieval: retrieval_start.elapsed(),
                        total: start.elapsed(),
                        ..StageTimings::default()
                    },
                    too_complex: false,
                    rejected: None,
                };
            }
        };
        let retrieval_time = retrieval_start.elapsed();

        let generation_start = Instant::now();
        let answer = if decomposition.is_multi() {
            self.generator
                .generate_multi_intent(query, &sub_queries, &evidence.chunks)
                .await
        } else {
            self.generator.generate(query, &evidence.chunks).await
        };
        let generation_time = generation_start.elapsed();

        info!(
            sources = answer.sources.len(),
            retrieved = evidence.chunks.len(),
            "pipeline turn complete"
        );

        PipelineResponse {
            query: query.to_string(),
            sub_queries,
            answer: answer.answer,
            sources: answer.sources,
            retrieved_chunks: evidence.chunks.len(),
            graded_stats: evidence.graded_stats,
            merge_stats: evidence.merge_stats,
            action_taken: evidence.action_taken,
            timings: StageTimings {
                decomposition: decomposition_time,
                retrieval: retrieval_time,
                generation: generation_time,
                total: start.elapsed(),
            },
            too_complex: false,
            rejected: None,
        }
    }

    async fn retrieve(&self, decomposition: &Decomposition) -> Result<RetrievedEvidence> {
        match decomposition {
            Decomposition::Single(sub_query) => {
                let query = RetrievalQuery::new(sub_query.clone())
                    .with_top_k_initial(self.retriever.config().top_k_initial)
                    .with_top_k_final(self.retriever.config().top_k_final);
                let outcome = self.retriever.retrieve(&query).await?;
                Ok(RetrievedEvidence {
                    chunks: outcome.refined_chunks,
                    graded_stats: Some(outcome.graded_stats),
                    merge_stats: None,
                    action_taken: Some(outcome.action_taken),
                })
            }
            Decomposition::Multi(sub_queries) => {
                let outcome = self.multi_retriever.retrieve_multi(sub_queries).await?;
                Ok(RetrievedEvidence {
                    chunks: outcome.merged_chunks,
                    graded_stats: None,
                    merge_stats: Some(outcome.stats),
                    action_taken: None,
                })
            }
            Decomposition::TooComplex => Err(CoragError::pipeline(
                "too-complex queries must short-circuit before retrieval",
            )),
        }
    }

    fn rejected_response(query: &str, reason: String) -> PipelineResponse {
        PipelineResponse {
            query: query.to_string(),
            sub_queries: Vec::new(),
            answer: reason.clone(),
            sources: Vec::new(),
            retrieved_chunks: 0,
            graded_stats: None,
            merge_stats: None,
            action_taken: None,
            timings: StageTimings::default(),
            too_complex: false,
            rejected: Some(reason),
        }
    }
}

/// Builder for creating pipelines.
#[derive(Debug, Default)]
pub struct RagPipelineBuilder {
    retriever: Option<Arc<CragRetriever>>,
    chat: Option<Arc<FailoverChat>>,
    gate: Option<Arc<dyn RequestGate>>,
    llm_config: Option<LlmConfig>,
    pipeline_config: Option<PipelineConfig>,
    decomposer_config: Option<DecomposerConfig>,
    multi_query_config: Option<MultiQueryConfig>,
}

impl RagPipelineBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CRAG retriever.
    #[must_use]
    pub fn retriever(mut self, retriever: Arc<CragRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set the chat model pool used for decomposition and generation.
    #[must_use]
    pub fn chat(mut self, chat: Arc<FailoverChat>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Set the request gate. A default sliding-window gate is used when
    /// not provided.
    #[must_use]
    pub fn gate(mut self, gate: Arc<dyn RequestGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Set the LLM pool configuration.
    #[must_use]
    pub fn llm_config(mut self, config: LlmConfig) -> Self {
        self.llm_config = Some(config);
        self
    }

    /// Set the pipeline configuration.
    #[must_use]
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    /// Set the decomposer configuration.
    #[must_use]
    pub fn decomposer_config(mut self, config: DecomposerConfig) -> Self {
        self.decomposer_config = Some(config);
        self
    }

    /// Set the multi-query retriever configuration.
    #[must_use]
    pub fn multi_query_config(mut self, config: MultiQueryConfig) -> Self {
        self.multi_query_config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the retriever or chat pool is
    /// missing, or when the default gate cannot be constructed.
    pub fn build(self) -> Result<RagPipeline> {
        let retriever = self
            .retriever
            .ok_or_else(|| CoragError::configuration("retriever is required"))?;
        let chat = self
            .chat
            .ok_or_else(|| CoragError::configuration("chat model pool is required"))?;

        let gate: Arc<dyn RequestGate> = match self.gate {
            Some(gate) => gate,
            None => Arc::new(SlidingWindowGate::new(GateConfig::default())?),
        };

        let pipeline_config = self.pipeline_config.unwrap_or_default();
        let decomposer =
            QueryDecomposer::new(Arc::clone(&chat), self.decomposer_config.unwrap_or_default());
        let generator = AnswerGenerator::new(
            chat,
            self.llm_config.unwrap_or_default(),
            pipeline_config.clone(),
        );
        let multi_retriever = MultiQueryRetriever::new(
            Arc::clone(&retriever),
            self.multi_query_config.unwrap_or_default(),
        );

        Ok(RagPipeline {
            retriever,
            multi_retriever,
            decomposer,
            generator,
            gate,
            config: pipeline_config,
        })
    }
}
