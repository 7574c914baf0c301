//! Bounded response cache.
//!
//! Caches generated answers keyed by a fingerprint of the query and the
//! evidence that backed it. The cache is an explicit state object owned by
//! the generator, with a deliberately blunt eviction policy: when the
//! entry bound is reached, the whole cache is cleared.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::types::{Chunk, GeneratedAnswer};

/// How many leading chunk identifiers participate in the fingerprint.
const FINGERPRINT_CHUNKS: usize = 5;

/// A size-bounded, clear-on-overflow answer cache.
///
/// Interior mutability keeps the call sites immutable-reference friendly;
/// the mutex is held only for map operations.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, GeneratedAnswer>>,
    max_size: usize,
}

impl ResponseCache {
    /// Create a cache bounded to `max_size` entries.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_size,
        }
    }

    /// Fingerprint a (query, evidence) pair.
    ///
    /// Only the first few chunk identifiers participate, matching the
    /// evidence bound generation actually sees.
    fn fingerprint(query: &str, chunks: &[Chunk]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        for chunk in chunks.iter().take(FINGERPRINT_CHUNKS) {
            hasher.update(b"|");
            hasher.update(chunk.chunk_id.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Look up a cached answer for the given query and evidence.
    #[must_use]
    pub fn get(&self, query: &str, chunks: &[Chunk]) -> Option<GeneratedAnswer> {
        let key = Self::fingerprint(query, chunks);
        self.entries
            .lock()
            .expect("response cache lock poisoned")
            .get(&key)
            .cloned()
    }

    /// Store an answer, clearing the cache first if it is full.
    pub fn put(&self, query: &str, chunks: &[Chunk], answer: GeneratedAnswer) {
        let key = Self::fingerprint(query, chunks);
        let mut entries = self.entries.lock().expect("response cache lock poisoned");
        if entries.len() >= self.max_size {
            entries.clear();
        }
        entries.insert(key, answer);
    }

    /// Number of cached answers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("response cache lock poisoned")
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> GeneratedAnswer {
        GeneratedAnswer {
            answer: text.to_string(),
            sources: Vec::new(),
            query: String::new(),
        }
    }

    #[test]
    fn test_hit_requires_same_evidence() {
        let cache = ResponseCache::new(10);
        let chunks = vec![Chunk::new("a", ""), Chunk::new("b", "")];
        cache.put("học phí", &chunks, answer("two million"));

        assert!(cache.get("học phí", &chunks).is_some());
        assert!(cache.get("học phí", &[Chunk::new("a", "")]).is_none());
        assert!(cache.get("học bổng", &chunks).is_none());
    }

    #[test]
    fn test_clear_on_overflow() {
        let cache = ResponseCache::new(2);
        cache.put("q1", &[], answer("a1"));
        cache.put("q2", &[], answer("a2"));
        assert_eq!(cache.len(), 2);

        // Third insert overflows: everything before it is dropped.
        cache.put("q3", &[], answer("a3"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("q1", &[]).is_none());
        assert!(cache.get("q3", &[]).is_some());
    }

    #[test]
    fn test_fingerprint_ignores_trailing_chunks() {
        let cache = ResponseCache::new(10);
        let five: Vec<Chunk> = (0..5).map(|i| Chunk::new(format!("c{i}"), String::new())).collect();
        let mut six = five.clone();
        six.push(Chunk::new("c5", ""));

        cache.put("q", &five, answer("a"));
        assert!(cache.get("q", &six).is_some());
    }
}
