

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};


pub struct EmbeddingCache {
    inner: Mutex<Inner>,
    ttl: Duration,
}

struct Inner {
    entries: LruCache<[u8; 32], CacheEntry>,
    stats: CacheStats,
}

struct CacheEntry {
    embedding: Vec<f32>,
    created_at: Instant,
}

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

fn cache_key(text: &str) -> [u8; 32] {
    Sha256::digest(text.as_bytes()).into()
}

impl EmbeddingCache {

    pub fn new(max_size: usize, ttl_secs: u64) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
            ttl: Duration::from_secs(ttl_secs),
        }
    }


    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = cache_key(text);
        let mut inner = self.inner.lock();

        let lookup = inner
            .entries
            .get(&key)
            .map(|entry| (entry.created_at.elapsed() < self.ttl, entry.embedding.clone()));

        match lookup {
            Some((true, embedding)) => {
                inner.stats.hits += 1;
                Some(embedding)
            }
            Some((false, _)) => {
                inner.entries.pop(&key);
                let size = inner.entries.len();
                inner.stats.misses += 1;
                inner.stats.size = size;
                None
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }


    pub fn set(&self, text: &str, embedding: Vec<f32>) {
        let mut inner = self.inner.lock();
        inner.entries.put(
            cache_key(text),
            CacheEntry {
                embedding,
                created_at: Instant::now(),
            },
        );
        let size = inner.entries.len();
        inner.stats.size = size;
    }


    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.stats.size = 0;
    }
}
