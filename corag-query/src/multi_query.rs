//! Multi-query retrieval for decomposed questions.
//!
//! Runs the CRAG retriever once per sub-query, tags every chunk with the
//! sub-query that found it (the multi-intent generation prompt needs the
//! provenance), and merges the results into one bounded, diverse evidence
//! set.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use corag_core::{
    config::MultiQueryConfig,
    types::{Chunk, MergeStats, RetrievalQuery},
    Result,
};

use crate::retriever::CragRetriever;

/// Result of retrieving for a set of sub-queries.
#[derive(Debug, Clone)]
pub struct MultiQueryOutcome {
    /// The merged, deduplicated, diversity-capped evidence set.
    pub merged_chunks: Vec<Chunk>,

    /// Refined chunks per sub-query, before merging.
    pub per_query: HashMap<String, Vec<Chunk>>,

    /// Merge statistics for observability.
    pub stats: MergeStats,
}

/// Fans a decomposed query set out across the CRAG retriever.
#[derive(Debug)]
pub struct MultiQueryRetriever {
    retriever: Arc<CragRetriever>,
    config: MultiQueryConfig,
}

impl MultiQueryRetriever {
    /// Create a multi-query retriever over a CRAG retriever.
    pub fn new(retriever: Arc<CragRetriever>, config: MultiQueryConfig) -> Self {
        Self { retriever, config }
    }

    /// Retrieve for each sub-query and merge the results.
    ///
    /// Retrieval failures for any sub-query fail the whole call; graded
    /// degradation already happened inside each CRAG retrieval.
    #[instrument(skip(self), fields(retriever = "MultiQueryRetriever"))]
    pub async fn retrieve_multi(&self, sub_queries: &[String]) -> Result<MultiQueryOutcome> {
        info!(count = sub_queries.len(), "multi-query retrieval");

        let mut per_query = HashMap::new();
        let mut all_chunks = Vec::new();

        for (index, sub_query) in sub_queries.iter().enumerate() {
            debug!(index = index + 1, query = %sub_query, "retrieving for sub-query");

            let query = RetrievalQuery::new(sub_query.clone())
                .with_top_k_initial(self.config.top_k_initial)
                .with_top_k_final(self.config.top_k_per_query);
            let outcome = self.retriever.retrieve(&query).await?;

            let mut chunks = outcome.refined_chunks;
            for chunk in &mut chunks {
                chunk.source_query = Some(sub_query.clone());
            }

            per_query.insert(sub_query.clone(), chunks.clone());
            all_chunks.extend(chunks);
        }

        let total_retrieved = all_chunks.len();
        let merged_chunks = merge_chunks(all_chunks, &self.config);
        let stats = MergeStats {
            total_queries: sub_queries.len(),
            total_retrieved,
            after_merge: merged_chunks.len(),
        };
        info!(
            total_retrieved = stats.total_retrieved,
            after_merge = stats.after_merge,
            "multi-query merge complete"
        );

        Ok(MultiQueryOutcome {
            merged_chunks,
            per_query,
            stats,
        })
    }
}

/// Merge chunks from several sub-queries into one evidence set.
///
/// Deduplicate by chunk identifier (first occurrence wins, so the
/// higher-priority sub-query keeps its version), sort by score
/// descending, admit at most `max_chunks_per_url` chunks per source URL,
/// and truncate to the evidence bound.
fn merge_chunks(chunks: Vec<Chunk>, config: &MultiQueryConfig) -> Vec<Chunk> {
    if chunks.is_empty() {
        return chunks;
    }

    let mut seen_ids = std::collections::HashSet::new();
    let mut deduped: Vec<Chunk> = chunks
        .into_iter()
        .filter(|chunk| {
            !chunk.chunk_id.is_empty() && seen_ids.insert(chunk.chunk_id.clone())
        })
        .collect();

    deduped.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut url_counts: HashMap<String, usize> = HashMap::new();
    let mut diverse = Vec::new();
    for chunk in deduped {
        let url = chunk.url.clone().unwrap_or_else(|| "unknown".to_string());
        let count = url_counts.entry(url).or_insert(0);
        if *count < config.max_chunks_per_url {
            *count += 1;
            diverse.push(chunk);
        }
    }

    diverse.truncate(config.max_merged_chunks);
    diverse
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, score: f32, url: &str) -> Chunk {
        Chunk::new(id, "content").with_score(score).with_url(url)
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let chunks = vec![
            chunk("a", 0.9, "https://x"),
            chunk("a", 0.1, "https://y"),
            chunk("b", 0.5, "https://x"),
        ];
        let merged = merge_chunks(chunks, &MultiQueryConfig::default());
        assert_eq!(merged.len(), 2);
        let a = merged.iter().find(|c| c.chunk_id == "a").unwrap();
        assert!((a.score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sorted_by_score_descending() {
        let chunks = vec![
            chunk("low", 0.2, "https://x"),
            chunk("high", 0.9, "https://y"),
            chunk("mid", 0.5, "https://z"),
        ];
        let merged = merge_chunks(chunks, &MultiQueryConfig::default());
        let ids: Vec<&str> = merged.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_url_diversity_cap() {
        let chunks: Vec<Chunk> = (0..5)
            .map(|i| chunk(&format!("c{i}"), 0.9 - i as f32 * 0.1, "https://same"))
            .collect();
        let merged = merge_chunks(chunks, &MultiQueryConfig::default());
        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|c| c.url.as_deref() == Some("https://same")));
    }

    #[test]
    fn test_diversity_cap_admits_later_urls() {
        let mut chunks: Vec<Chunk> = (0..4)
            .map(|i| chunk(&format!("same{i}"), 0.9, "https://same"))
            .collect();
        chunks.push(chunk("other", 0.1, "https://other"));

        let merged = merge_chunks(chunks, &MultiQueryConfig::default());
        // Three from the dominating URL, then the lower-scored outlier.
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.last().unwrap().chunk_id, "other");
    }

    #[test]
    fn test_truncated_to_evidence_bound() {
        let chunks: Vec<Chunk> = (0..10)
            .map(|i| chunk(&format!("c{i}"), 1.0 - i as f32 * 0.05, &format!("https://u{i}")))
            .collect();
        let merged = merge_chunks(chunks, &MultiQueryConfig::default());
        assert_eq!(merged.len(), 6);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_chunks(Vec::new(), &MultiQueryConfig::default()).is_empty());
    }
}
