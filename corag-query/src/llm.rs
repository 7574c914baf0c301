//! Failover across a pool of chat models.
//!
//! Every LLM-backed stage in the engine calls through [`FailoverChat`]: a
//! pool of candidate models with per-model failure tracking. Models are
//! tried least-failed-first; a model that has reached the failure ceiling
//! is skipped until a success elsewhere would have reset it. This is the
//! only retry mechanism in the engine — there is no per-call retry loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use corag_core::{
    traits::{ChatModel, CompletionOptions},
    CoragError, Result,
};

/// A chat completion client backed by a pool of models with
/// least-failed-first failover.
///
/// Failure counts are explicit state owned by this object, shared by every
/// component holding a clone of the `Arc`; the mutex is held only to read
/// or bump counters, never across a model call.
#[derive(Debug)]
pub struct FailoverChat {
    models: Vec<Arc<dyn ChatModel>>,
    failure_counts: Mutex<HashMap<String, u32>>,
    max_failures: u32,
}

impl FailoverChat {
    /// Create a pool over the given models.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pool is empty.
    pub fn new(models: Vec<Arc<dyn ChatModel>>, max_failures: u32) -> Result<Self> {
        if models.is_empty() {
            return Err(CoragError::configuration(
                "failover pool requires at least one model",
            ));
        }
        Ok(Self {
            models,
            failure_counts: Mutex::new(HashMap::new()),
            max_failures,
        })
    }

    /// Complete the prompt against the healthiest model available.
    ///
    /// Models are ordered by ascending failure count (pool order breaks
    /// ties); models at the failure ceiling are skipped. The first success
    /// resets that model's count and returns. If every model fails or is
    /// skipped, the last error is surfaced.
    pub async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String> {
        let order = self.failover_order();
        let mut last_error: Option<CoragError> = None;

        for index in order {
            let model = &self.models[index];
            let name = model.model_name().to_string();

            if self.failure_count(&name) >= self.max_failures {
                debug!(model = %name, "skipping model at failure ceiling");
                continue;
            }

            match model.complete(prompt, options).await {
                Ok(text) => {
                    self.reset_failures(&name);
                    debug!(model = %name, "completion succeeded");
                    return Ok(text);
                }
                Err(error) => {
                    let count = self.record_failure(&name);
                    warn!(model = %name, failures = count, %error, "model call failed");
                    last_error = Some(error);
                }
            }
        }

        Err(match last_error {
            Some(error) => CoragError::llm(format!("all models in the pool failed: {error}")),
            None => CoragError::llm("all models in the pool are at the failure ceiling"),
        })
    }

    /// Current failure count for a model.
    #[must_use]
    pub fn failure_count(&self, model_name: &str) -> u32 {
        *self
            .failure_counts
            .lock()
            .expect("failure count lock poisoned")
            .get(model_name)
            .unwrap_or(&0)
    }

    /// Pool indices ordered by ascending failure count. The sort is
    /// stable, so pool order decides ties.
    fn failover_order(&self) -> Vec<usize> {
        let counts: Vec<u32> = {
            let counts = self
                .failure_counts
                .lock()
                .expect("failure count lock poisoned");
            self.models
                .iter()
                .map(|m| *counts.get(m.model_name()).unwrap_or(&0))
                .collect()
        };
        let mut order: Vec<usize> = (0..self.models.len()).collect();
        order.sort_by_key(|&i| counts[i]);
        order
    }

    fn record_failure(&self, model_name: &str) -> u32 {
        let mut counts = self
            .failure_counts
            .lock()
            .expect("failure count lock poisoned");
        let count = counts.entry(model_name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn reset_failures(&self, model_name: &str) {
        self.failure_counts
            .lock()
            .expect("failure count lock poisoned")
            .insert(model_name.to_string(), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A model that fails a fixed number of times before succeeding.
    #[derive(Debug)]
    struct FlakyModel {
        name: String,
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FlakyModel {
        fn new(name: &str, failures: usize) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                failures_left: AtomicUsize::new(failures),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatModel for FlakyModel {
        async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(CoragError::llm("provider unavailable"));
            }
            Ok(format!("answer from {}", self.name))
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }

    #[tokio::test]
    async fn test_failover_to_second_model() {
        let broken = FlakyModel::new("broken", 99);
        let healthy = FlakyModel::new("healthy", 0);
        let pool = FailoverChat::new(vec![broken.clone(), healthy.clone()], 3).unwrap();

        let text = pool
            .complete("hi", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "answer from healthy");
        assert_eq!(pool.failure_count("broken"), 1);
        assert_eq!(pool.failure_count("healthy"), 0);
    }

    #[tokio::test]
    async fn test_least_failed_first_ordering() {
        let first = FlakyModel::new("first", 1);
        let second = FlakyModel::new("second", 0);
        let pool = FailoverChat::new(vec![first.clone(), second.clone()], 3).unwrap();

        // First call: "first" fails once, "second" answers.
        pool.complete("hi", &CompletionOptions::default())
            .await
            .unwrap();

        // Second call: "second" now has the lower failure count and must
        // be tried first, so "first" sees no further calls.
        let before = first.calls.load(Ordering::SeqCst);
        pool.complete("hi", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(first.calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_ceiling_skips_model() {
        let broken = FlakyModel::new("broken", 99);
        let pool = FailoverChat::new(vec![broken.clone()], 2).unwrap();

        for _ in 0..2 {
            assert!(pool
                .complete("hi", &CompletionOptions::default())
                .await
                .is_err());
        }
        let calls_at_ceiling = broken.calls.load(Ordering::SeqCst);

        // At the ceiling the model is skipped entirely.
        assert!(pool
            .complete("hi", &CompletionOptions::default())
            .await
            .is_err());
        assert_eq!(broken.calls.load(Ordering::SeqCst), calls_at_ceiling);
    }

    #[tokio::test]
    async fn test_success_resets_count() {
        let flaky = FlakyModel::new("flaky", 1);
        let pool = FailoverChat::new(vec![flaky.clone()], 3).unwrap();

        assert!(pool
            .complete("hi", &CompletionOptions::default())
            .await
            .is_err());
        assert_eq!(pool.failure_count("flaky"), 1);

        pool.complete("hi", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(pool.failure_count("flaky"), 0);
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(FailoverChat::new(Vec::new(), 3).is_err());
    }
}
