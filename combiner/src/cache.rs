use crate::metrics_defs::{BUNDLE_CACHE_HIT, BUNDLE_CACHE_MISS};
use bytes::Bytes;
use moka::Expiry;
use moka::sync::Cache;
use shared::counter;
use std::time::{Duration, Instant};

const MAX_ENTRIES: u64 = 10_000;

/// Cache key: canonical signature concatenation plus the compression
/// variant, so raw and gzipped bodies never collide.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct BundleKey {
    pub signature: String,
    pub compressed: bool,
}

/// One cached response body. Never mutated, only replaced; the TTL is
/// absolute from insertion.
#[derive(Clone, Debug)]
pub struct CachedBundle {
    pub bytes: Bytes,
    pub ttl: Duration,
}

struct PerBundleExpiry;

impl Expiry<BundleKey, CachedBundle> for PerBundleExpiry {
    fn expire_after_create(
        &self,
        _key: &BundleKey,
        value: &CachedBundle,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    // Replacing an entry restarts the clock: the TTL is absolute from
    // the latest insertion, not the first.
    fn expire_after_update(
        &self,
        _key: &BundleKey,
        value: &CachedBundle,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-wide TTL store for assembled bundles.
///
/// When `enabled` is false (dev environments) reads always report a
/// miss but writes still happen. That asymmetry is inherited behavior
/// the shared-cache contract documents; do not "fix" it here without
/// revisiting the contract.
pub struct BundleCache {
    cache: Cache<BundleKey, CachedBundle>,
    enabled: bool,
}

impl BundleCache {
    pub fn new(enabled: bool) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(PerBundleExpiry)
            .build();

        BundleCache { cache, enabled }
    }

    /// Looks up a bundle. `force_refresh` skips the read without
    /// evicting the stored entry.
    pub fn get(&self, key: &BundleKey, force_refresh: bool) -> Option<CachedBundle> {
        if !self.enabled || force_refresh {
            counter!(BUNDLE_CACHE_MISS).increment(1);
            return None;
        }

        let hit = self.cache.get(key);
        let metric_def = if hit.is_some() {
            BUNDLE_CACHE_HIT
        } else {
            BUNDLE_CACHE_MISS
        };
        counter!(metric_def).increment(1);
        hit
    }

    /// Stores a bundle. Zero-length payloads are never stored.
    pub fn put(&self, key: BundleKey, bundle: CachedBundle) {
        if bundle.bytes.is_empty() {
            return;
        }
        self.cache.insert(key, bundle);
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &BundleKey) -> bool {
        self.cache.contains_key(key)
    }
}
