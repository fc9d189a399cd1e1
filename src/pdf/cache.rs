//! LRU cache for rendered page surfaces

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::types::PageSurface;

/// Cache key for rendered pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Document handle generation
    pub generation: u64,
    /// Page number (1-based)
    pub page: usize,
    /// Scale factor (stored as millionths for stable hashing)
    pub scale_millionths: u32,
}

impl CacheKey {
    #[must_use]
    pub fn new(generation: u64, page: usize, scale: f32) -> Self {
        Self {
            generation,
            page,
            scale_millionths: (scale * 1_000_000.0).round() as u32,
        }
    }
}

/// LRU cache for rendered surfaces
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<PageSurface>>,
}

impl PageCache {
    /// Create a new cache with the given capacity (at least one entry)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached surface, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<PageSurface>> {
        self.cache.get(key).cloned()
    }

    /// Insert a surface, returning the shared handle stored in the cache
    pub fn insert(&mut self, key: CacheKey, surface: PageSurface) -> Arc<PageSurface> {
        let arc = Arc::new(surface);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Drop every surface rendered from an older document generation
    pub fn retain_generation(&mut self, generation: u64) {
        let stale: Vec<_> = self
            .cache
            .iter()
            .filter(|(k, _)| k.generation != generation)
            .map(|(k, _)| k.clone())
            .collect();

        for key in stale {
            self.cache.pop(&key);
        }
    }

    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
