//! Configuration structures for the corag engine.
//!
//! Every tunable in the retrieval-correction loop lives here: retrieval
//! bounds, grading thresholds, expansion bands, decomposition signals, the
//! LLM model pool, and the request gate budget. The string-matching
//! heuristics (score boosting, keyword fallback injection) are modeled as
//! ordered rule lists so they stay testable and extensible independently
//! of the algorithm.
//!
//! The numeric defaults are empirically chosen for the original admissions
//! knowledge base; re-tune them before pointing the engine at a different
//! domain.

mod llm;
mod pipeline;
mod retrieval;

pub use llm::LlmConfig;
pub use pipeline::{GateConfig, PipelineConfig};
pub use retrieval::{
    BoostRule, DecomposerConfig, EvaluatorConfig, ExpanderConfig, InjectRule, MultiQueryConfig,
    RetrievalConfig,
};
