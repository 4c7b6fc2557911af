//! Registry of per-module caches for one engine instance.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::{CacheHandle, ModuleCache, NullCache};
use crate::module::ModuleId;

struct Registered {
    name: &'static str,
    cache: Arc<ModuleCache>,
}

/// Outcome of pruning one module's cache at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    pub module: ModuleId,
    pub name: &'static str,
    pub removed: usize,
    pub remaining: usize,
}

/// Owns one `ModuleCache` per module instance.
///
/// Caches are created lazily and exactly once per module, even when several
/// threads ask for the same module at the same time. They live until the
/// registry is dropped (engine teardown) or caching is disabled.
pub struct CacheRegistry {
    caches: DashMap<ModuleId, Registered>,
    /// Held for reading while a cache is handed out, for writing while the
    /// flag flips, so a disable never races a concurrent creation.
    disabled: RwLock<bool>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            caches: DashMap::new(),
            disabled: RwLock::new(false),
        }
    }

    pub fn with_disabled(disabled: bool) -> Self {
        let registry = Self::new();
        registry.set_disabled(disabled);
        registry
    }

    /// Get the cache for `module`, creating it on first request.
    ///
    /// While disabled, returns a `NullCache` and records nothing.
    pub fn get_or_create(&self, module: ModuleId, name: &'static str) -> CacheHandle {
        let disabled = self.disabled.read();
        if *disabled {
            return CacheHandle::Null(NullCache);
        }

        // The entry holds the shard lock, so racing first requests converge
        let cache = self
            .caches
            .entry(module)
            .or_insert_with(|| Registered {
                name,
                cache: Arc::new(ModuleCache::new()),
            })
            .cache
            .clone();

        CacheHandle::Module(cache)
    }

    /// Enable or disable caching globally.
    ///
    /// Disabling discards every existing cache. Re-enabling only lets future
    /// requests build fresh caches; discarded entries do not come back.
    pub fn set_disabled(&self, flag: bool) {
        let mut disabled = self.disabled.write();
        if flag {
            self.caches.clear();
        }
        *disabled = flag;
    }

    pub fn is_disabled(&self) -> bool {
        *self.disabled.read()
    }

    /// Clear hit flags on every registered cache (start of a top-level run).
    pub fn reset_all_hits(&self) {
        for entry in self.caches.iter() {
            entry.cache.reset_hits();
        }
    }

    /// Drop unhit entries from every registered cache (end of a top-level run).
    ///
    /// `report` is called once per registered module. Returns the total number
    /// of removed entries.
    pub fn prune_all(&self, mut report: impl FnMut(&PruneReport)) -> usize {
        let mut total = 0;
        for entry in self.caches.iter() {
            let removed = entry.cache.clear_unhit();
            total += removed;
            report(&PruneReport {
                module: *entry.key(),
                name: entry.name,
                removed,
                remaining: entry.cache.len(),
            });
        }
        total
    }

    /// Number of registered module caches.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Total entries across all module caches.
    pub fn entry_count(&self) -> usize {
        self.caches.iter().map(|entry| entry.cache.len()).sum()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fingerprint;
    use crate::module::ModuleIds;
    use std::sync::Barrier;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::of(s)
    }

    #[test]
    fn test_get_or_create_returns_same_cache() {
        let registry = CacheRegistry::new();
        let ids = ModuleIds::new();
        let id = ids.next();

        registry.get_or_create(id, "markdown").put(fp("a"), 1u32);
        let again = registry.get_or_create(id, "markdown");
        assert_eq!(*again.get::<u32>(&fp("a")).unwrap(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_modules_get_distinct_caches() {
        let registry = CacheRegistry::new();
        let ids = ModuleIds::new();
        let (a, b) = (ids.next(), ids.next());

        registry.get_or_create(a, "markdown").put(fp("k"), 1u32);
        assert!(registry.get_or_create(b, "markdown").get::<u32>(&fp("k")).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_first_access_converges() {
        let registry = CacheRegistry::new();
        let id = ModuleIds::new().next();
        let barrier = Barrier::new(8);

        std::thread::scope(|s| {
            for i in 0..8u32 {
                let registry = &registry;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    registry
                        .get_or_create(id, "markdown")
                        .put(fp(&i.to_string()), i);
                });
            }
        });

        assert_eq!(registry.len(), 1);
        let cache = registry.get_or_create(id, "markdown");
        for i in 0..8u32 {
            assert_eq!(*cache.get::<u32>(&fp(&i.to_string())).unwrap(), i);
        }
    }

    #[test]
    fn test_disable_discards_and_reenable_does_not_resurrect() {
        let registry = CacheRegistry::new();
        let id = ModuleIds::new().next();
        registry.get_or_create(id, "markdown").put(fp("a"), 1u32);

        registry.set_disabled(true);
        assert!(registry.is_empty());

        let disabled = registry.get_or_create(id, "markdown");
        assert!(disabled.is_null());
        disabled.put(fp("b"), 2u32);
        assert!(disabled.get::<u32>(&fp("b")).is_none());
        assert!(registry.is_empty());

        registry.set_disabled(false);
        let fresh = registry.get_or_create(id, "markdown");
        assert!(!fresh.is_null());
        assert!(fresh.get::<u32>(&fp("a")).is_none());
    }

    #[test]
    fn test_reset_and_prune_across_modules() {
        let registry = CacheRegistry::new();
        let ids = ModuleIds::new();
        let (a, b) = (ids.next(), ids.next());

        let cache_a = registry.get_or_create(a, "front_matter");
        let cache_b = registry.get_or_create(b, "markdown");
        cache_a.put(fp("1"), 1u8);
        cache_a.put(fp("2"), 2u8);
        cache_b.put(fp("3"), 3u8);

        registry.reset_all_hits();
        cache_a.get::<u8>(&fp("1"));

        let mut reports = Vec::new();
        let total = registry.prune_all(|report| reports.push(*report));
        reports.sort_by_key(|r| r.module);

        assert_eq!(total, 2);
        assert_eq!(reports.len(), 2);
        assert_eq!(
            (reports[0].name, reports[0].removed, reports[0].remaining),
            ("front_matter", 1, 1)
        );
        assert_eq!(
            (reports[1].name, reports[1].removed, reports[1].remaining),
            ("markdown", 1, 0)
        );
        assert_eq!(registry.entry_count(), 1);
    }

    #[test]
    fn test_with_disabled_starts_null() {
        let registry = CacheRegistry::with_disabled(true);
        assert!(registry.is_disabled());
        assert!(registry.get_or_create(ModuleIds::new().next(), "copy").is_null());
    }
}
