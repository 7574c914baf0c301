//! Multi-intent query decomposition.
//!
//! Detects questions that carry several independent intents and splits
//! them into standalone sub-questions. Comparison questions are protected
//! by a guard that runs before any other signal: they contain conjunctions
//! but must be answered as one retrieval, so the guard short-circuits
//! every other rule.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use corag_core::{
    config::DecomposerConfig,
    traits::CompletionOptions,
    types::Decomposition,
    Result,
};

use crate::llm::FailoverChat;
use crate::util::{parse_string_array, strip_code_fences};

const DECOMPOSITION_PROMPT: &str = r#"Phân tách câu hỏi phức tạp thành các câu hỏi đơn giản, độc lập.

QUY TẮC QUAN TRỌNG:
1. CHỈ phân tách nếu câu hỏi THỰC SỰ có NHIỀU Ý KHÁC NHAU
2. KHÔNG phân tách nếu chỉ là 1 câu hỏi duy nhất
3. Mỗi câu hỏi con phải HOÀN CHỈNH, độc lập
4. KHÔNG tạo thêm câu hỏi không có trong câu gốc
5. TỐI ĐA 3 câu hỏi con
6. KHÔNG TÁCH câu hỏi SO SÁNH (có từ "so sánh", "và", hoặc so sánh 2 thứ)

VÍ DỤ ĐÚNG (CẦN PHÂN TÁCH):
Input: "Học phí CNTT bao nhiêu và trường có học bổng không?"
Output: ["Học phí ngành CNTT là bao nhiêu?", "Trường có học bổng không?"]

VÍ DỤ SAI - CÂU SO SÁNH (KHÔNG TÁCH):
Input: "So sánh học phí ngành CNTT và ngành Luật"
Output: ["So sánh học phí ngành CNTT và ngành Luật"]

VÍ DỤ SAI - CÂU ĐƠN (KHÔNG TÁCH):
Input: "Tôi có 18 điểm thì có thể đậu vào ngành nào?"
Output: ["Tôi có 18 điểm thì có thể đậu vào ngành nào?"]

CÂU HỎI CẦN XỬ LÝ:
"{query}"

Trả về JSON array:"#;

/// Comparison-indicating patterns. A match anywhere short-circuits
/// decomposition unconditionally.
const COMPARISON_PATTERNS: &[&str] = &[
    r"^so\s*sánh",
    r"so\s*sánh\s+.+\s+và\s+",
    r"khác\s*nhau",
    r"giống\s*nhau",
    r"hơn\s+hay\s+",
    r".+\s+hay\s+.+\s+tốt\s+hơn",
];

/// Multi-clause conjunction patterns. Each side must carry enough text to
/// look like an independent clause.
const MULTI_CLAUSE_PATTERNS: &[&str] = &[
    r".{10,}\s+và\s+.{10,}",
    r".{10,}\s+hay\s+.{10,}",
    r".{10,}\s+hoặc\s+.{10,}",
    r".{10,}\s+còn\s+.{10,}",
    r".{10,}\s+ngoài ra\s+.{10,}",
];

const MULTI_CLAUSE_WEIGHT: f32 = 0.8;
const MULTIPLE_QUESTIONS_WEIGHT: f32 = 0.9;
const ENUMERATION_WEIGHT: f32 = 0.85;

/// Outcome of the rule-based pre-check.
#[derive(Debug)]
struct SignalCheck {
    should_decompose: bool,
    confidence: f32,
    reason: String,
}

/// Detects and splits multi-intent questions.
#[derive(Debug)]
pub struct QueryDecomposer {
    llm: Arc<FailoverChat>,
    config: DecomposerConfig,
    comparison_guards: Vec<Regex>,
    multi_clause: Vec<Regex>,
    enumeration: Regex,
    bracket_block: Regex,
    quoted_string: Regex,
}

impl QueryDecomposer {
    /// Create a decomposer over the given model pool.
    pub fn new(llm: Arc<FailoverChat>, config: DecomposerConfig) -> Self {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("static decomposer regex"))
                .collect::<Vec<_>>()
        };
        Self {
            llm,
            config,
            comparison_guards: compile(COMPARISON_PATTERNS),
            multi_clause: compile(MULTI_CLAUSE_PATTERNS),
            enumeration: Regex::new(r"[0-9]\.\s+\w+.*[0-9]\.\s+\w+")
                .expect("static enumeration regex"),
            bracket_block: Regex::new(r"(?s)\[(.*?)\]").expect("static bracket regex"),
            quoted_string: Regex::new(r#""([^"]+)""#).expect("static quoted-string regex"),
        }
    }

    /// Decompose a query, or return it unchanged.
    ///
    /// The comparison guard and signal scoring run first; the LLM is only
    /// consulted when the rule layer is confident the query is
    /// multi-intent. Any error on the LLM path degrades to
    /// [`Decomposition::Single`] with the original query.
    pub async fn decompose(&self, query: &str) -> Decomposition {
        let check = self.should_decompose(query);
        if !check.should_decompose {
            debug!(
                confidence = check.confidence,
                reason = %check.reason,
                "keeping query as single intent"
            );
            return Decomposition::Single(query.to_string());
        }

        info!(reason = %check.reason, "complex query detected");
        match self.llm_decompose(query).await {
            Ok(sub_queries) => self.validate(query, sub_queries),
            Err(error) => {
                warn!(%error, "decomposition failed, using original query");
                Decomposition::Single(query.to_string())
            }
        }
    }

    /// Rule-based pre-check: comparison guard first, then weighted
    /// signals averaged over the signals that actually fired.
    fn should_decompose(&self, query: &str) -> SignalCheck {
        let query_lower = query.to_lowercase();
        let query_lower = query_lower.trim();

        for guard in &self.comparison_guards {
            if guard.is_match(query_lower) {
                return SignalCheck {
                    should_decompose: false,
                    confidence: 0.0,
                    reason: "comparison query, kept as single".to_string(),
                };
            }
        }

        let mut signals: Vec<(&str, f32)> = Vec::new();

        if self
            .multi_clause
            .iter()
            .any(|pattern| pattern.is_match(query_lower))
        {
            signals.push(("multi_clause", MULTI_CLAUSE_WEIGHT));
        }
        if query.matches('?').count() >= 2 {
            signals.push(("multiple_questions", MULTIPLE_QUESTIONS_WEIGHT));
        }
        if self.enumeration.is_match(query) {
            signals.push(("enumeration", ENUMERATION_WEIGHT));
        }

        if signals.is_empty() {
            return SignalCheck {
                should_decompose: false,
                confidence: 0.0,
                reason: "simple single-intent query".to_string(),
            };
        }

        let confidence =
            signals.iter().map(|(_, w)| w).sum::<f32>() / signals.len() as f32;
        SignalCheck {
            should_decompose: confidence >= self.config.signal_threshold,
            confidence,
            reason: format!(
                "detected: {:?}",
                signals.iter().map(|(name, _)| *name).collect::<Vec<_>>()
            ),
        }
    }

    /// Validate LLM output into a decomposition result.
    fn validate(&self, query: &str, sub_queries: Vec<String>) -> Decomposition {
        let query_lower = query.to_lowercase();
        let valid: Vec<String> = sub_queries
            .into_iter()
            .filter(|sub| sub.chars().count() > self.config.min_sub_question_chars)
            .filter(|sub| sub.to_lowercase() != query_lower)
            .collect();

        if valid.len() < 2 {
            debug!("decomposition produced fewer than two valid sub-questions");
            return Decomposition::Single(query.to_string());
        }
        if valid.len() > self.config.max_sub_questions {
            warn!(count = valid.len(), "query too complex to answer in one pass");
            return Decomposition::TooComplex;
        }

        info!(count = valid.len(), "query split into sub-questions");
        Decomposition::Multi(valid)
    }

    /// Ask the LLM to split the query into a JSON array of sub-questions.
    ///
    /// Falls back to extracting quoted strings from the first bracketed
    /// block when the response is not valid JSON.
    async fn llm_decompose(&self, query: &str) -> Result<Vec<String>> {
        let prompt = DECOMPOSITION_PROMPT.replace("{query}", query);
        let options = CompletionOptions::default()
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm.complete(&prompt, &options).await?;

        if let Some(sub_queries) = parse_string_array(&response) {
            return Ok(sub_queries);
        }

        let cleaned = strip_code_fences(&response);
        if let Some(block) = self.bracket_block.captures(&cleaned) {
            let items: Vec<String> = self
                .quoted_string
                .captures_iter(&block[1])
                .map(|cap| cap[1].trim().to_string())
                .filter(|item| !item.is_empty())
                .collect();
            if !items.is_empty() {
                return Ok(items);
            }
        }

        // Nothing extractable: treat as "keep the original".
        Ok(vec![query.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use corag_core::traits::ChatModel;
    use corag_core::CoragError;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct ScriptedModel {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn pool(responses: &[&str]) -> Arc<FailoverChat> {
            let model = Arc::new(Self {
                responses: Mutex::new(responses.iter().rev().map(ToString::to_string).collect()),
            });
            Arc::new(FailoverChat::new(vec![model], 3).unwrap())
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> corag_core::Result<String> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CoragError::llm("script exhausted"))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn decomposer(responses: &[&str]) -> QueryDecomposer {
        QueryDecomposer::new(ScriptedModel::pool(responses), DecomposerConfig::default())
    }

    #[tokio::test]
    async fn test_comparison_query_never_decomposed() {
        // Contains a multi-clause conjunction, but the guard wins.
        let query = "So sánh điểm chuẩn ngành Kinh tế và ngành Kế toán năm nay";
        let result = decomposer(&[]).decompose(query).await;
        assert_eq!(result, Decomposition::Single(query.to_string()));
    }

    #[tokio::test]
    async fn test_implicit_comparison_protected() {
        let query = "Ngành CNTT hay ngành Luật tốt hơn cho người thích công nghệ?";
        let result = decomposer(&[]).decompose(query).await;
        assert!(matches!(result, Decomposition::Single(_)));
    }

    #[tokio::test]
    async fn test_simple_query_stays_single() {
        let query = "Học phí ngành CNTT là bao nhiêu?";
        let result = decomposer(&[]).decompose(query).await;
        assert_eq!(result, Decomposition::Single(query.to_string()));
    }

    #[tokio::test]
    async fn test_multi_intent_split() {
        let query = "Học phí CNTT bao nhiêu và trường có học bổng không?";
        let response =
            r#"["Học phí ngành CNTT là bao nhiêu?", "Trường có học bổng không?"]"#;
        let result = decomposer(&[response]).decompose(query).await;
        assert_eq!(
            result,
            Decomposition::Multi(vec![
                "Học phí ngành CNTT là bao nhiêu?".to_string(),
                "Trường có học bổng không?".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn test_four_sub_questions_is_too_complex() {
        let query = "Học phí bao nhiêu và có học bổng không và ký túc xá thế nào?";
        let response = r#"["Học phí ngành CNTT là bao nhiêu?",
            "Trường có học bổng sinh viên không?",
            "Ký túc xá của trường như thế nào?",
            "Thủ tục nhập học gồm những gì?"]"#;
        let result = decomposer(&[response]).decompose(query).await;
        assert_eq!(result, Decomposition::TooComplex);
    }

    #[tokio::test]
    async fn test_short_sub_questions_discarded() {
        let query = "Học phí CNTT bao nhiêu và trường có học bổng không?";
        // One valid sub-question plus noise: decomposition is abandoned.
        let response = r#"["Học phí?", "ok", "Trường có học bổng không vậy?"]"#;
        let result = decomposer(&[response]).decompose(query).await;
        assert_eq!(result, Decomposition::Single(query.to_string()));
    }

    #[tokio::test]
    async fn test_llm_failure_returns_original() {
        let query = "Học phí CNTT bao nhiêu và trường có học bổng không?";
        let result = decomposer(&[]).decompose(query).await;
        assert_eq!(result, Decomposition::Single(query.to_string()));
    }

    #[tokio::test]
    async fn test_bracket_fallback_parsing() {
        let query = "Học phí CNTT bao nhiêu và trường có học bổng không?";
        let response = r#"Sure! ["Học phí ngành CNTT là bao nhiêu?", "Trường có học bổng không?"] hope that helps"#;
        let result = decomposer(&[response]).decompose(query).await;
        assert!(result.is_multi());
    }

    #[tokio::test]
    async fn test_double_question_mark_signal() {
        let query = "Trường ở đâu vậy? Có xe buýt đến không?";
        let response = r#"["Trường đại học nằm ở địa chỉ nào?", "Có tuyến xe buýt nào đến trường không?"]"#;
        let result = decomposer(&[response]).decompose(query).await;
        assert!(result.is_multi());
    }
}
