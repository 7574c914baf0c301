//! Answer and pipeline response types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::chunk::{Chunk, ChunkKind};
use super::retrieval::{GradeStats, MergeStats};

/// A citation derived from one evidence chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Identifier of the cited chunk.
    pub chunk_id: String,

    /// Source URL, `#` when the chunk has none.
    pub url: String,

    /// Human-readable title (explicit title, humanized identifier, or a
    /// generic label).
    pub title: String,

    /// Score the chunk carried into generation.
    pub score: f32,

    /// Content type of the cited chunk.
    pub kind: ChunkKind,

    /// The sub-query this chunk answered, for multi-intent responses.
    pub related_to: Option<String>,
}

impl SourceRef {
    /// Derive a citation from a chunk.
    #[must_use]
    pub fn from_chunk(chunk: &Chunk, generic_label: &str) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            url: chunk.url.clone().unwrap_or_else(|| "#".to_string()),
            title: chunk.display_title(generic_label),
            score: chunk.score,
            kind: chunk.kind,
            related_to: chunk.source_query.clone(),
        }
    }
}

/// An LLM-generated answer with its citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    /// The answer text.
    pub answer: String,

    /// Citations, one per evidence chunk, in evidence order.
    pub sources: Vec<SourceRef>,

    /// The query the answer responds to.
    pub query: String,
}

impl GeneratedAnswer {
    /// Number of cited sources.
    #[must_use]
    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }
}

/// Wall-clock duration of each pipeline stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    /// Time spent in query decomposition.
    pub decomposition: Duration,

    /// Time spent in retrieval (single- or multi-query).
    pub retrieval: Duration,

    /// Time spent in answer generation.
    pub generation: Duration,

    /// Total time for the pipeline run.
    pub total: Duration,
}

/// The complete result of one pipeline turn.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    /// The original user query.
    pub query: String,

    /// Sub-queries produced by decomposition (single-element when the
    /// query was not split, empty when it was rejected or too complex).
    pub sub_queries: Vec<String>,

    /// The answer text shown to the user.
    pub answer: String,

    /// Citations backing the answer.
    pub sources: Vec<SourceRef>,

    /// Number of evidence chunks that reached generation.
    pub retrieved_chunks: usize,

    /// Grading statistics from the single-query path.
    pub graded_stats: Option<GradeStats>,

    /// Merge statistics from the multi-query path.
    pub merge_stats: Option<MergeStats>,

    /// The corrective action taken, when the single-query path ran.
    pub action_taken: Option<super::retrieval::CorrectiveAction>,

    /// Per-stage wall-clock timings.
    pub timings: StageTimings,

    /// Whether the query was rejected as carrying too many intents.
    pub too_complex: bool,

    /// Rejection reason from the request gate, when the turn was refused
    /// before retrieval.
    pub rejected: Option<String>,
}
