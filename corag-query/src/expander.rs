//! Paraphrase expansion for recall recovery.
//!
//! When initial retrieval grades poorly, the expander asks an LLM for
//! semantically equivalent rephrasings of the query and keeps only the
//! variants whose embedding sits in a similarity band relative to the
//! original: close enough to stay on topic, far enough to search a
//! different region of the index. Expansion is best-effort; every failure
//! degrades to the original query.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use corag_core::{
    config::ExpanderConfig,
    traits::{cosine_similarity, CompletionOptions, Embedder},
    Result,
};

use crate::llm::FailoverChat;
use crate::util::parse_string_array;

const EXPANSION_PROMPT: &str = r#"Bạn là hệ thống tạo biến thể câu hỏi để cải thiện tìm kiếm.

NHIỆM VỤ: Tạo {num_variations} cách hỏi KHÁC NHAU cho cùng 1 ý nghĩa.

QUY TẮC:
1. Giữ NGUYÊN Ý NGHĨA gốc
2. Thay đổi CẤU TRÚC CÂU và TỪ NGỮ
3. Dùng TỪ ĐỒNG NGHĨA, PARAPHRASE
4. KHÔNG thêm/bớt thông tin
5. Mỗi biến thể phải KHÁC BIỆT rõ ràng

VÍ DỤ:
Query: "Học phí ngành CNTT là bao nhiêu?"
Variations:
1. "Chi phí học tập ngành Công nghệ thông tin?"
2. "Mức thu học phí chuyên ngành IT?"

---

CÂU HỎI GỐC:
"{query}"

Trả về JSON array với {num_variations} biến thể:"#;

/// LLM-backed query paraphraser with an embedding-similarity filter.
#[derive(Debug)]
pub struct QueryExpander {
    llm: Arc<FailoverChat>,
    embedder: Arc<dyn Embedder>,
    config: ExpanderConfig,
    numbered_line: Regex,
}

impl QueryExpander {
    /// Create an expander over the given model pool and embedder.
    pub fn new(llm: Arc<FailoverChat>, embedder: Arc<dyn Embedder>, config: ExpanderConfig) -> Self {
        Self {
            llm,
            embedder,
            config,
            numbered_line: Regex::new(r#"(?m)[0-9]+\.\s*"?([^"\n]+)"?"#)
                .expect("static numbered-line regex"),
        }
    }

    /// Produce up to `num_variations` paraphrases of the query.
    ///
    /// Queries below the minimum token count are not expanded: the
    /// original is returned unchanged (or nothing, when the caller
    /// excludes it). Generation or filtering errors likewise degrade to
    /// the original — expansion never fails the caller.
    pub async fn expand(
        &self,
        query: &str,
        num_variations: usize,
        include_original: bool,
    ) -> Vec<String> {
        let passthrough = || {
            if include_original {
                vec![query.to_string()]
            } else {
                Vec::new()
            }
        };

        if query.split_whitespace().count() < self.config.min_query_tokens {
            debug!("query too short, skipping expansion");
            return passthrough();
        }

        let raw_variations = match self.llm_expand(query, num_variations).await {
            Ok(variations) if !variations.is_empty() => variations,
            Ok(_) => return passthrough(),
            Err(error) => {
                warn!(%error, "expansion failed, using original query only");
                return passthrough();
            }
        };

        let variations = if self.config.use_filtering {
            match self
                .filter_by_similarity(query, raw_variations.clone(), num_variations)
                .await
            {
                Ok(filtered) => filtered,
                Err(error) => {
                    warn!(%error, "similarity filtering failed, using unfiltered variants");
                    raw_variations.into_iter().take(num_variations).collect()
                }
            }
        } else {
            raw_variations.into_iter().take(num_variations).collect()
        };

        let mut expanded = Vec::new();
        if include_original {
            expanded.push(query.to_string());
        }
        expanded.extend(variations);
        info!(count = expanded.len(), "query expansion complete");
        expanded
    }

    /// Ask the LLM for paraphrases and parse them out of the response.
    ///
    /// Structured-list parsing first; numbered-line extraction as the
    /// fallback. Variants identical to the query are discarded either way.
    async fn llm_expand(&self, query: &str, num_variations: usize) -> Result<Vec<String>> {
        let prompt = EXPANSION_PROMPT
            .replace("{num_variations}", &num_variations.to_string())
            .replace("{query}", query);

        let options = CompletionOptions::default()
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm.complete(&prompt, &options).await?;

        let candidates = parse_string_array(&response).unwrap_or_else(|| {
            self.numbered_line
                .captures_iter(&response)
                .map(|cap| cap[1].trim().to_string())
                .collect()
        });

        let query_lower = query.to_lowercase();
        Ok(candidates
            .into_iter()
            .filter(|variant| !variant.is_empty())
            .filter(|variant| variant.to_lowercase() != query_lower)
            .collect())
    }

    /// Keep variants whose cosine similarity to the query lies strictly
    /// inside the configured band, ranked by similarity descending.
    async fn filter_by_similarity(
        &self,
        query: &str,
        variations: Vec<String>,
        top_k: usize,
    ) -> Result<Vec<String>> {
        if variations.is_empty() {
            return Ok(variations);
        }

        let query_vec = self.embedder.embed(query).await?;
        let variant_refs: Vec<&str> = variations.iter().map(String::as_str).collect();
        let variant_vecs = self.embedder.embed_batch(variant_refs).await?;

        let mut scored: Vec<(f32, String)> = variations
            .into_iter()
            .zip(variant_vecs.iter())
            .filter_map(|(variant, vec)| {
                let similarity = cosine_similarity(&query_vec, vec);
                if similarity > self.config.min_similarity
                    && similarity < self.config.max_similarity
                {
                    Some((similarity, variant))
                } else {
                    debug!(%variant, similarity, "variant outside similarity band");
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(top_k).map(|(_, v)| v).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use corag_core::traits::ChatModel;
    use corag_core::CoragError;
    use std::collections::HashMap;
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

    /// Embeds known texts to fixed vectors; unknown texts to a default.
    #[derive(Debug, Default)]
    struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
    }

    impl TableEmbedder {
        fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.to_string(), vector);
            self
        }
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> corag_core::Result<Vec<f32>> {
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![1.0, 0.0]))
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "table-embedder"
        }
    }

    const QUERY: &str = "Điều kiện xét tuyển ngành Logistics là gì?";

    #[tokio::test]
    async fn test_short_query_not_expanded() {
        let expander = QueryExpander::new(
            ScriptedModel::pool(&[]),
            Arc::new(TableEmbedder::default()),
            ExpanderConfig::default(),
        );

        assert_eq!(
            expander.expand("học phí", 2, true).await,
            vec!["học phí".to_string()]
        );
        assert!(expander.expand("học phí", 2, false).await.is_empty());
    }

    #[tokio::test]
    async fn test_similarity_band_filters_variants() {
        // on_topic sits inside the band, duplicate above it, off_topic below.
        let on_topic = "Yêu cầu để vào ngành Logistics?";
        let duplicate = "Điều kiện xét tuyển ngành Logistics?";
        let off_topic = "Thời tiết hôm nay thế nào?";

        let embedder = TableEmbedder::default()
            .with(QUERY, vec![1.0, 0.0])
            .with(on_topic, vec![0.8, 0.6])
            .with(duplicate, vec![1.0, 0.001])
            .with(off_topic, vec![0.1, 0.99]);

        let response = format!(r#"["{on_topic}", "{duplicate}", "{off_topic}"]"#);
        let expander = QueryExpander::new(
            ScriptedModel::pool(&[&response]),
            Arc::new(embedder),
            ExpanderConfig::default(),
        );

        let expanded = expander.expand(QUERY, 3, false).await;
        assert_eq!(expanded, vec![on_topic.to_string()]);
    }

    #[tokio::test]
    async fn test_numbered_line_fallback() {
        let response = "Here you go:\n1. \"Chi phí theo học ngành Logistics?\"\n2. Tiêu chuẩn tuyển sinh Logistics là gì?\n";
        let config = ExpanderConfig {
            use_filtering: false,
            ..ExpanderConfig::default()
        };
        let expander = QueryExpander::new(
            ScriptedModel::pool(&[response]),
            Arc::new(TableEmbedder::default()),
            config,
        );

        let expanded = expander.expand(QUERY, 2, false).await;
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0], "Chi phí theo học ngành Logistics?");
    }

    #[tokio::test]
    async fn test_generation_failure_degrades_to_original() {
        let expander = QueryExpander::new(
            ScriptedModel::pool(&[]),
            Arc::new(TableEmbedder::default()),
            ExpanderConfig::default(),
        );

        assert_eq!(
            expander.expand(QUERY, 2, true).await,
            vec![QUERY.to_string()]
        );
    }

    #[tokio::test]
    async fn test_variant_identical_to_query_discarded() {
        let response = format!(r#"["{QUERY}"]"#);
        let config = ExpanderConfig {
            use_filtering: false,
            ..ExpanderConfig::default()
        };
        let expander = QueryExpander::new(
            ScriptedModel::pool(&[&response]),
            Arc::new(TableEmbedder::default()),
            config,
        );

        assert!(expander.expand(QUERY, 2, false).await.is_empty());
    }
}
