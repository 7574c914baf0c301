//! Grading and correction types for the retrieval state machine.

use serde::{Deserialize, Serialize};

use super::chunk::Chunk;

/// Relevance verdict for a single (query, chunk) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelevanceLabel {
    /// The chunk answers the query directly and specifically.
    Correct,

    /// The chunk is related but too generic or partial.
    Ambiguous,

    /// The chunk is unrelated to the query.
    Incorrect,
}

/// Per-bucket cardinalities of a graded candidate set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeStats {
    /// Number of chunks graded correct.
    pub correct: usize,

    /// Number of chunks graded ambiguous.
    pub ambiguous: usize,

    /// Number of chunks graded incorrect.
    pub incorrect: usize,
}

impl GradeStats {
    /// Total number of graded chunks.
    #[must_use]
    pub fn total(&self) -> usize {
        self.correct + self.ambiguous + self.incorrect
    }
}

/// Corrective action chosen from the graded evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectiveAction {
    /// Internal evidence is worthless; fall back to external search.
    WebSearch,

    /// Internal evidence is trustworthy; refine and use it alone.
    KnowledgeRefinement,

    /// Mix surviving internal evidence with external search results.
    Hybrid,

    /// Initial retrieval returned nothing; terminal empty result.
    None,
}

impl std::fmt::Display for CorrectiveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WebSearch => "WEB_SEARCH",
            Self::KnowledgeRefinement => "KNOWLEDGE_REFINEMENT",
            Self::Hybrid => "HYBRID",
            Self::None => "NONE",
        };
        write!(f, "{name}")
    }
}

/// A candidate list partitioned into relevance buckets.
///
/// Invariant: every input chunk lands in exactly one bucket, so the bucket
/// cardinalities always sum to the input length.
#[derive(Debug, Clone, Default)]
pub struct GradedChunks {
    /// Chunks graded correct.
    pub correct: Vec<Chunk>,

    /// Chunks graded ambiguous.
    pub ambiguous: Vec<Chunk>,

    /// Chunks graded incorrect.
    pub incorrect: Vec<Chunk>,
}

impl GradedChunks {
    /// Partition chunks by their labels.
    ///
    /// Labels beyond the chunk count are ignored; chunks beyond the label
    /// count are treated as ambiguous, preserving the sum invariant even
    /// on malformed input.
    #[must_use]
    pub fn from_labels(chunks: Vec<Chunk>, labels: &[RelevanceLabel]) -> Self {
        let mut graded = Self::default();
        for (i, chunk) in chunks.into_iter().enumerate() {
            match labels.get(i).copied().unwrap_or(RelevanceLabel::Ambiguous) {
                RelevanceLabel::Correct => graded.correct.push(chunk),
                RelevanceLabel::Ambiguous => graded.ambiguous.push(chunk),
                RelevanceLabel::Incorrect => graded.incorrect.push(chunk),
            }
        }
        graded
    }

    /// Bucket cardinalities.
    #[must_use]
    pub fn stats(&self) -> GradeStats {
        GradeStats {
            correct: self.correct.len(),
            ambiguous: self.ambiguous.len(),
            incorrect: self.incorrect.len(),
        }
    }

    /// Total number of graded chunks.
    #[must_use]
    pub fn total(&self) -> usize {
        self.correct.len() + self.ambiguous.len() + self.incorrect.len()
    }

    /// Whether the correct bucket is below the expansion threshold.
    #[must_use]
    pub fn needs_expansion(&self, min_correct_threshold: usize) -> bool {
        self.correct.len() < min_correct_threshold
    }

    /// Choose the corrective action.
    ///
    /// A pure function of the bucket cardinalities:
    /// no correct and no ambiguous evidence escalates to web search,
    /// two or more correct chunks allow pure knowledge refinement,
    /// and anything in between mixes both sources.
    #[must_use]
    pub fn decide_action(&self) -> CorrectiveAction {
        let correct = self.correct.len();
        let ambiguous = self.ambiguous.len();

        if correct == 0 && ambiguous == 0 {
            return CorrectiveAction::WebSearch;
        }
        if correct >= 2 {
            return CorrectiveAction::KnowledgeRefinement;
        }
        CorrectiveAction::Hybrid
    }
}

/// Final product of one retrieval call.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    /// The query that was retrieved for.
    pub query: String,

    /// The refined, ordered evidence set (at most `top_k_final` chunks,
    /// plus at most one injected fallback chunk).
    pub refined_chunks: Vec<Chunk>,

    /// Bucket cardinalities from the final grading pass.
    pub graded_stats: GradeStats,

    /// The corrective action that produced the evidence set.
    pub action_taken: CorrectiveAction,

    /// Whether the expansion branch ran.
    pub expansion_triggered: bool,
}

impl RetrievalOutcome {
    /// The terminal outcome for a query with zero initial candidates.
    #[must_use]
    pub fn empty<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            refined_chunks: Vec::new(),
            graded_stats: GradeStats::default(),
            action_taken: CorrectiveAction::None,
            expansion_triggered: false,
        }
    }
}

/// Merge statistics reported by the multi-query retriever.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MergeStats {
    /// Number of sub-queries retrieved for.
    pub total_queries: usize,

    /// Chunks gathered across all sub-queries before merging.
    pub total_retrieved: usize,

    /// Chunks remaining after dedup, diversity capping, and truncation.
    pub after_merge: usize,
}

/// Result of query decomposition.
///
/// `TooComplex` is a first-class sentinel, not an error: callers must
/// short-circuit retrieval and generation and ask the user to narrow the
/// question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decomposition {
    /// The query carries a single intent; retrieve for it as-is.
    Single(String),

    /// The query split into independent sub-questions (always 2..=3).
    Multi(Vec<String>),

    /// The query has too many intents to answer in one pass.
    TooComplex,
}

impl Decomposition {
    /// The sub-queries to retrieve for, in order.
    ///
    /// Empty for [`Decomposition::TooComplex`].
    #[must_use]
    pub fn sub_queries(&self) -> Vec<String> {
        match self {
            Self::Single(query) => vec![query.clone()],
            Self::Multi(queries) => queries.clone(),
            Self::TooComplex => Vec::new(),
        }
    }

    /// Whether the query decomposed into multiple intents.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }
}
