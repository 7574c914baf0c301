//! Retrieval, grading, expansion, and decomposition configuration.

use serde::{Deserialize, Serialize};

/// A score-boost rule: chunks whose identifier contains the marker get an
/// additive score bonus before re-ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostRule {
    /// Substring matched (case-insensitively) against chunk identifiers.
    pub marker: String,

    /// Additive bonus applied to the chunk's similarity score.
    pub bonus: f32,
}

impl BoostRule {
    /// Create a boost rule.
    pub fn new<S: Into<String>>(marker: S, bonus: f32) -> Self {
        Self {
            marker: marker.into(),
            bonus,
        }
    }
}

/// A keyword fallback rule: when the normalized query contains any trigger
/// term and the target chunk is absent from the final evidence, the chunk
/// is fetched by identifier and prepended with a maximal score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectRule {
    /// Identifier of the chunk to force-include.
    pub chunk_id: String,

    /// Trigger terms, matched as substrings of the lower-cased query.
    /// Both accented and plain spellings should be listed.
    pub triggers: Vec<String>,
}

impl InjectRule {
    /// Create an injection rule.
    pub fn new<S: Into<String>>(chunk_id: S, triggers: &[&str]) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            triggers: triggers.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

/// Configuration for the CRAG retriever state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Nearest neighbors fetched by the initial (and each expansion)
    /// vector search.
    pub top_k_initial: usize,

    /// Maximum size of the refined evidence set.
    pub top_k_final: usize,

    /// Expansion triggers when fewer chunks than this grade correct.
    pub min_correct_threshold: usize,

    /// Paraphrase variants requested from the expander.
    pub num_expansion_variants: usize,

    /// Upper bound on concurrent embed+search round-trips during the
    /// expansion fan-out.
    pub max_concurrent_expansions: usize,

    /// Ordered score-boost rules.
    pub boost_rules: Vec<BoostRule>,

    /// Ordered keyword fallback injection rules.
    pub inject_rules: Vec<InjectRule>,

    /// Relative-time phrases rewritten to the reference year during query
    /// normalization.
    pub time_phrases: Vec<String>,

    /// Absolute year substituted for relative-time phrases.
    pub reference_year: u16,

    /// Web results requested when the action is pure web search.
    pub web_results_on_fallback: usize,

    /// Web results mixed in when the action is hybrid.
    pub web_results_on_hybrid: usize,

    /// Correct chunks kept by knowledge refinement.
    pub refinement_limit: usize,

    /// Internal chunks kept by the hybrid action.
    pub hybrid_internal_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_initial: 4,
            top_k_final: 2,
            min_correct_threshold: 2,
            num_expansion_variants: 2,
            max_concurrent_expansions: 3,
            boost_rules: ["lien-he", "dia-chi", "hotline", "contact", "lien-lac"]
                .iter()
                .map(|marker| BoostRule::new(*marker, 0.15))
                .collect(),
            inject_rules: vec![
                InjectRule::new(
                    "thong-tin-lien-he-cua-truong",
                    &[
                        "lien he",
                        "dia chi",
                        "hotline",
                        "dien thoai",
                        "email",
                        "so dt",
                        "zalo",
                        "liên hệ",
                        "địa chỉ",
                        "điện thoại",
                        "số điện thoại",
                        "thông tin liên hệ",
                    ],
                ),
                InjectRule::new(
                    "ho-so-xet-tuyen-dai-hoc-chinh-quy-2023_chunk_1",
                    &[
                        "ho so",
                        "ho so xet tuyen",
                        "giay to",
                        "can chuan bi gi",
                        "nop ho so",
                        "hồ sơ",
                        "hồ sơ xét tuyển",
                        "giấy tờ",
                        "cần chuẩn bị gì",
                        "nộp hồ sơ",
                    ],
                ),
            ],
            time_phrases: vec![
                "năm nay".to_string(),
                "hiện nay".to_string(),
                "hiện tại".to_string(),
            ],
            reference_year: 2025,
            web_results_on_fallback: 3,
            web_results_on_hybrid: 2,
            refinement_limit: 5,
            hybrid_internal_limit: 3,
        }
    }
}

/// Configuration for the LLM relevance evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// CORRECT labels below this confidence are demoted to AMBIGUOUS.
    pub confidence_threshold: f32,

    /// Character budget for the per-candidate snippet sent to the judge.
    pub max_snippet_chars: usize,

    /// Sampling temperature for the judge call.
    pub temperature: f32,

    /// Token budget for the judge call.
    pub max_tokens: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            max_snippet_chars: 500,
            temperature: 0.1,
            max_tokens: 300,
        }
    }
}

/// Configuration for the query expander.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpanderConfig {
    /// Queries with fewer whitespace tokens than this are not expanded.
    pub min_query_tokens: usize,

    /// Variants below this cosine similarity to the original are dropped
    /// as off-topic (exclusive bound).
    pub min_similarity: f32,

    /// Variants above this cosine similarity are dropped as
    /// near-duplicates (exclusive bound).
    pub max_similarity: f32,

    /// Whether the embedding-similarity filter runs at all.
    pub use_filtering: bool,

    /// Sampling temperature for variant generation; higher buys diversity.
    pub temperature: f32,

    /// Token budget for variant generation.
    pub max_tokens: usize,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            min_query_tokens: 4,
            min_similarity: 0.5,
            max_similarity: 0.95,
            use_filtering: true,
            temperature: 0.7,
            max_tokens: 200,
        }
    }
}

/// Configuration for the query decomposer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposerConfig {
    /// The average of triggered signal weights must reach this value for
    /// LLM decomposition to run.
    pub signal_threshold: f32,

    /// Sub-questions shorter than this many characters are discarded.
    pub min_sub_question_chars: usize,

    /// More valid sub-questions than this yields the too-complex sentinel.
    pub max_sub_questions: usize,

    /// Sampling temperature for the split call; low for stability.
    pub temperature: f32,

    /// Token budget for the split call.
    pub max_tokens: usize,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            signal_threshold: 0.75,
            min_sub_question_chars: 15,
            max_sub_questions: 3,
            temperature: 0.2,
            max_tokens: 200,
        }
    }
}

/// Configuration for the multi-query retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiQueryConfig {
    /// Final evidence requested per sub-query.
    pub top_k_per_query: usize,

    /// Initial retrieval width per sub-query.
    pub top_k_initial: usize,

    /// Maximum chunks admitted per distinct source URL after merging.
    pub max_chunks_per_url: usize,

    /// Maximum size of the merged evidence set.
    pub max_merged_chunks: usize,
}

impl Default for MultiQueryConfig {
    fn default() -> Self {
        Self {
            top_k_per_query: 3,
            top_k_initial: 4,
            max_chunks_per_url: 3,
            max_merged_chunks: 6,
        }
    }
}
