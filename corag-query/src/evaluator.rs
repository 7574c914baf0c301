//! LLM-based relevance grading.
//!
//! The evaluator classifies each (query, candidate) pair as CORRECT,
//! AMBIGUOUS, or INCORRECT in one batched judge call, with a
//! confidence-based safety downgrade. Grading is fail-safe: any judge
//! failure or unparsable output yields AMBIGUOUS for the whole batch
//! rather than an error.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use corag_core::{
    config::EvaluatorConfig,
    traits::CompletionOptions,
    types::{Chunk, GradedChunks, RelevanceLabel},
    Result,
};

use crate::llm::FailoverChat;
use crate::util::strip_code_fences;

const EVALUATION_PROMPT: &str = r#"Đánh giá tài liệu dựa trên câu hỏi.

CÂU HỎI: "{query}"

TIÊU CHÍ PHÂN LOẠI:
- CORRECT: Chứa thông tin trả lời trực tiếp, cụ thể.
- INCORRECT: Không liên quan.
- AMBIGUOUS: Liên quan nhưng chung chung/thiếu ý.

YÊU CẦU OUTPUT:
Trả về JSON object chứa danh sách "evaluations". Mỗi phần tử gồm:
- "label": [CORRECT/INCORRECT/AMBIGUOUS]
- "confidence": [0.0 đến 1.0]

INPUT:
{documents}

JSON OUTPUT FORMAT (Mẫu):
{
  "evaluations": [
    {"label": "CORRECT", "confidence": 0.95},
    {"label": "AMBIGUOUS", "confidence": 0.4}
  ]
}

CHỈ trả về JSON hợp lệ."#;

fn default_confidence() -> f32 {
    0.5
}

/// One raw verdict as returned by the judge.
#[derive(Debug, Deserialize)]
struct RawEvaluation {
    #[serde(default)]
    label: String,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct RawBatch {
    #[serde(default)]
    evaluations: Vec<RawEvaluation>,
}

/// Batched LLM judge for candidate relevance.
#[derive(Debug)]
pub struct RelevanceEvaluator {
    llm: Arc<FailoverChat>,
    config: EvaluatorConfig,
    sentence_split: Regex,
}

impl RelevanceEvaluator {
    /// Create an evaluator over the given model pool.
    pub fn new(llm: Arc<FailoverChat>, config: EvaluatorConfig) -> Self {
        Self {
            llm,
            config,
            sentence_split: Regex::new(r"[.!?\n]+").expect("static sentence regex"),
        }
    }

    /// Grade candidates into relevance buckets.
    ///
    /// The partition preserves candidate order inside each bucket; the
    /// bucket cardinalities always sum to the input length.
    pub async fn grade(&self, query: &str, chunks: Vec<Chunk>) -> GradedChunks {
        debug!(candidates = chunks.len(), "grading candidates");
        let labels = self.evaluate_batch(query, &chunks).await;
        let graded = GradedChunks::from_labels(chunks, &labels);
        let stats = graded.stats();
        info!(
            correct = stats.correct,
            ambiguous = stats.ambiguous,
            incorrect = stats.incorrect,
            "relevance grading complete"
        );
        graded
    }

    /// Label every candidate, one label per chunk in input order.
    ///
    /// The output length always equals the input length: short judge
    /// output is padded with AMBIGUOUS at confidence zero, excess output
    /// is truncated, and a failed judge call labels the whole batch
    /// AMBIGUOUS.
    pub async fn evaluate_batch(&self, query: &str, chunks: &[Chunk]) -> Vec<RelevanceLabel> {
        if chunks.is_empty() {
            return Vec::new();
        }
        match self.try_evaluate(query, chunks).await {
            Ok(labels) => labels,
            Err(error) => {
                warn!(%error, "relevance grading failed, defaulting batch to ambiguous");
                vec![RelevanceLabel::Ambiguous; chunks.len()]
            }
        }
    }

    async fn try_evaluate(&self, query: &str, chunks: &[Chunk]) -> Result<Vec<RelevanceLabel>> {
        let documents: String = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "DOC {}:\n{}\n---\n",
                    i + 1,
                    self.extract_relevant_content(query, chunk)
                )
            })
            .collect();

        let prompt = EVALUATION_PROMPT
            .replace("{query}", query)
            .replace("{documents}", &documents);

        let options = CompletionOptions::default()
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_json_mode(true);

        let response = self.llm.complete(&prompt, &options).await?;
        let parsed: RawBatch = serde_json::from_str(&strip_code_fences(&response))?;

        let mut evals = parsed.evaluations;
        if evals.len() != chunks.len() {
            warn!(
                expected = chunks.len(),
                got = evals.len(),
                "evaluation count mismatch, padding with ambiguous"
            );
            evals.truncate(chunks.len());
            while evals.len() < chunks.len() {
                evals.push(RawEvaluation {
                    label: "AMBIGUOUS".to_string(),
                    confidence: 0.0,
                });
            }
        }

        Ok(evals
            .iter()
            .map(|eval| self.resolve_label(eval))
            .collect())
    }

    /// Map a raw verdict to a label, applying the confidence downgrade.
    ///
    /// INCORRECT is matched before CORRECT (the former contains the
    /// latter as a substring) and is never upgraded. A CORRECT verdict
    /// below the confidence threshold is demoted to AMBIGUOUS.
    fn resolve_label(&self, eval: &RawEvaluation) -> RelevanceLabel {
        let raw = eval.label.to_uppercase();
        let label = if raw.contains("INCORRECT") {
            RelevanceLabel::Incorrect
        } else if raw.contains("CORRECT") {
            RelevanceLabel::Correct
        } else {
            RelevanceLabel::Ambiguous
        };

        if label == RelevanceLabel::Correct && eval.confidence < self.config.confidence_threshold {
            debug!(
                confidence = eval.confidence,
                "downgraded low-confidence CORRECT to AMBIGUOUS"
            );
            return RelevanceLabel::Ambiguous;
        }
        label
    }

    /// Pick the most informative part of a chunk for the judge prompt.
    ///
    /// Long content is reduced to its most keyword-dense sentences under
    /// the character budget; once half the budget is filled, sentences
    /// with no keyword overlap are skipped. When no sentence qualifies,
    /// the head and tail of the content are kept instead.
    fn extract_relevant_content(&self, query: &str, chunk: &Chunk) -> String {
        let content = chunk.best_content();
        let budget = self.config.max_snippet_chars;
        if content.chars().count() <= budget {
            return content.to_string();
        }

        let keywords: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|word| word.chars().count() > 2)
            .map(ToString::to_string)
            .collect();

        let sentences: Vec<String> = self
            .sentence_split
            .split(content)
            .map(str::trim)
            .filter(|sentence| sentence.chars().count() > 10)
            .map(ToString::to_string)
            .collect();

        if sentences.is_empty() {
            return content.chars().take(budget).collect();
        }

        let mut scored: Vec<(usize, String)> = sentences
            .into_iter()
            .map(|sentence| {
                let lower = sentence.to_lowercase();
                let score = keywords.iter().filter(|kw| lower.contains(*kw)).count();
                (score, sentence)
            })
            .collect();
        // Stable sort: equally scored sentences keep document order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut selected: Vec<String> = Vec::new();
        let mut used = 0usize;
        for (score, sentence) in scored {
            let length = sentence.chars().count();
            if score == 0 && used > budget / 2 {
                continue;
            }
            if used + length > budget {
                break;
            }
            used += length;
            selected.push(sentence);
        }

        if selected.is_empty() {
            let half = budget / 2;
            let head: String = content.chars().take(half).collect();
            let tail_chars: Vec<char> = content.chars().collect();
            let tail: String = tail_chars[tail_chars.len().saturating_sub(half)..]
                .iter()
                .collect();
            return format!("{head}\n...\n{tail}");
        }

        selected.join(" ... ")
    }
}
