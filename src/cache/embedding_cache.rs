use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe LRU cache for query embeddings
///
/// Lets a repeated question skip the live embedding call. Keys are the
/// question text with surrounding whitespace removed.
pub struct QueryEmbeddingCache {
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl QueryEmbeddingCache {
    /// Create a cache holding at most `capacity` embeddings (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Cached embedding for `query`, refreshing its recency
    pub fn get(&self, query: &str) -> Option<Vec<f32>> {
        self.lock().get(query.trim()).cloned()
    }

    pub fn put(&self, query: &str, embedding: Vec<f32>) {
        self.lock().put(query.trim().to_string(), embedding);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are plain data, so a poisoned lock still holds a usable cache
    fn lock(&self) -> MutexGuard<'_, LruCache<String, Vec<f32>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
