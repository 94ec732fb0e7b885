//! The cache of thematic features.
//!
//! Thematic features are expensive to build, so the layer keeps them around
//! keyed by feature and zoom level. The cache is bounded by a maximum number
//! of entries. When it grows beyond that, the oldest entries are evicted
//! first. Looking up an entry does not change its position, so eviction
//! strictly follows insertion order.

use std::fmt;
use lru::LruCache;
use tracing::debug;
use crate::builder::ThematicFeature;
use crate::feature::FeatureId;

/// The factor between feature count and derived maximum cache count.
pub const AUTO_CACHE_FACTOR: usize = 5;


//------------ CacheKey ------------------------------------------------------

/// The key of a cache entry.
///
/// This is the feature identifier and the zoom level joined by `_zoom_`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(id: &FeatureId, zoom: f64) -> Self {
        CacheKey(format!("{}_zoom_{}", id, zoom))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}


//------------ MaxCacheCount -------------------------------------------------

/// The maximum number of cache entries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MaxCacheCount {
    /// The count follows the number of features.
    Auto(usize),

    /// The count has been set explicitly and stays as it is.
    Fixed(usize),
}

impl MaxCacheCount {
    pub fn get(self) -> usize {
        match self {
            MaxCacheCount::Auto(count) | MaxCacheCount::Fixed(count) => count
        }
    }

    pub fn is_fixed(self) -> bool {
        matches!(self, MaxCacheCount::Fixed(_))
    }

    /// Updates an automatic count for a new number of features.
    pub fn derive(&mut self, features: usize) {
        if let MaxCacheCount::Auto(ref mut count) = *self {
            *count = features.saturating_mul(AUTO_CACHE_FACTOR)
        }
    }
}

impl Default for MaxCacheCount {
    fn default() -> Self {
        MaxCacheCount::Auto(0)
    }
}


//------------ ShapeCache ----------------------------------------------------

/// The cache of thematic features.
pub struct ShapeCache {
    /// The entries.
    ///
    /// We only ever look at entries via `peek`, so the least recently used
    /// entry is always the one inserted first.
    entries: LruCache<CacheKey, ThematicFeature>,

    max_count: MaxCacheCount,
}

impl Default for ShapeCache {
    fn default() -> Self {
        ShapeCache {
            entries: LruCache::unbounded(),
            max_count: MaxCacheCount::default(),
        }
    }
}

impl ShapeCache {
    pub fn new(max_count: MaxCacheCount) -> Self {
        ShapeCache { max_count, .. Default::default() }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&ThematicFeature> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains(key)
    }

    /// Adds an entry and evicts the oldest entries if over capacity.
    ///
    /// If the key was present already, the entry is replaced and counts as
    /// newly inserted. Returns the keys of the evicted entries.
    pub fn put(
        &mut self, key: CacheKey, value: ThematicFeature
    ) -> Vec<CacheKey> {
        let _ = self.entries.push(key, value);
        let mut evicted = Vec::new();
        while self.entries.len() > self.max_count.get() {
            match self.entries.pop_lru() {
                Some((key, _)) => {
                    debug!(key = %key, "evicted cache entry");
                    evicted.push(key);
                }
                None => break
            }
        }
        evicted
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "clearing cache");
        }
        self.entries.clear()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the keys of all entries, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> + '_ {
        self.entries.iter().rev().map(|(key, _)| key)
    }

    pub fn max_count(&self) -> MaxCacheCount {
        self.max_count
    }

    /// Fixes the maximum count.
    ///
    /// The count will not be derived from the number of features anymore.
    /// Existing entries are only evicted on the next insert.
    pub fn set_max_count(&mut self, count: usize) {
        self.max_count = MaxCacheCount::Fixed(count)
    }

    /// Derives the maximum count from the number of features unless fixed.
    pub fn derive_max_count(&mut self, features: usize) {
        self.max_count.derive(features)
    }
}


//============ Tests =========================================================
