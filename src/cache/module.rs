//! Per-module result cache.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use crate::document::Fingerprint;

/// A cached value of any type, shared with every reader.
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// A single cached value plus its "accessed this run" marker.
struct CacheEntry {
    value: CacheValue,
    hit: AtomicBool,
}

impl CacheEntry {
    fn fresh(value: CacheValue) -> Self {
        // Just produced in this run, so it must survive end-of-run pruning
        Self {
            value,
            hit: AtomicBool::new(true),
        }
    }
}

/// Fingerprint → value store scoped to exactly one module instance.
///
/// Safe to use from many documents of the same module concurrently:
/// lookups and inserts lock a single shard, and values are immutable `Arc`s,
/// so a reader sees either the old or the new value, never a partial one.
///
/// Inserting on an occupied fingerprint overwrites (last writer wins).
#[derive(Default)]
pub struct ModuleCache {
    entries: DashMap<Fingerprint, CacheEntry>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value and mark its entry as hit.
    ///
    /// A stored value of a different type counts as a miss and leaves the
    /// entry untouched.
    pub fn get<T: Any + Send + Sync>(&self, fingerprint: &Fingerprint) -> Option<Arc<T>> {
        let entry = self.entries.get(fingerprint)?;
        let value = Arc::clone(&entry.value).downcast::<T>().ok()?;
        entry.hit.store(true, Ordering::Relaxed);
        Some(value)
    }

    /// Store or replace the value for `fingerprint`. The entry starts hit.
    pub fn put<T: Any + Send + Sync>(&self, fingerprint: Fingerprint, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries
            .insert(fingerprint, CacheEntry::fresh(Arc::clone(&value) as CacheValue));
        value
    }

    /// Return the cached value, or compute and store it on a miss.
    ///
    /// The computation runs outside any lock. Two racing misses on the same
    /// fingerprint both compute; the later `put` wins.
    pub fn get_or_compute<T, E>(
        &self,
        fingerprint: Fingerprint,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
    {
        if let Some(value) = self.get::<T>(&fingerprint) {
            return Ok(value);
        }
        Ok(self.put(fingerprint, compute()?))
    }

    /// Clear the hit flag on every entry without removing any.
    pub fn reset_hits(&self) {
        for entry in self.entries.iter() {
            entry.hit.store(false, Ordering::Relaxed);
        }
    }

    /// Remove every entry not hit since the last `reset_hits`.
    ///
    /// Returns how many entries were removed.
    pub fn clear_unhit(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.hit.load(Ordering::Relaxed);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Hit flag of an entry, without marking it (diagnostics only).
    pub fn is_hit(&self, fingerprint: &Fingerprint) -> Option<bool> {
        self.entries
            .get(fingerprint)
            .map(|entry| entry.hit.load(Ordering::Relaxed))
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ModuleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
