//! The cache capability a module holds during execution.
//!
//! Selected once at acquisition time: a real `ModuleCache` when caching is
//! enabled, a `NullCache` when it is globally disabled. Call sites use the
//! same methods either way and never check the disabled flag themselves.

use std::any::Any;
use std::sync::Arc;

use super::ModuleCache;
use crate::document::Fingerprint;

/// Caching-disabled stand-in: always misses, never stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl NullCache {
    #[inline]
    pub fn get<T: Any + Send + Sync>(&self, _fingerprint: &Fingerprint) -> Option<Arc<T>> {
        None
    }

    #[inline]
    pub fn put<T: Any + Send + Sync>(&self, _fingerprint: Fingerprint, value: T) -> Arc<T> {
        Arc::new(value)
    }

    #[inline]
    pub fn reset_hits(&self) {}

    #[inline]
    pub fn clear_unhit(&self) -> usize {
        0
    }
}

/// Cache handle given to a module for one execution.
#[derive(Debug, Clone)]
pub enum CacheHandle {
    Module(Arc<ModuleCache>),
    Null(NullCache),
}

impl CacheHandle {
    pub fn get<T: Any + Send + Sync>(&self, fingerprint: &Fingerprint) -> Option<Arc<T>> {
        match self {
            Self::Module(cache) => cache.get(fingerprint),
            Self::Null(cache) => cache.get(fingerprint),
        }
    }

    pub fn put<T: Any + Send + Sync>(&self, fingerprint: Fingerprint, value: T) -> Arc<T> {
        match self {
            Self::Module(cache) => cache.put(fingerprint, value),
            Self::Null(cache) => cache.put(fingerprint, value),
        }
    }

    pub fn get_or_compute<T, E>(
        &self,
        fingerprint: Fingerprint,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
    {
        match self {
            Self::Module(cache) => cache.get_or_compute(fingerprint, compute),
            Self::Null(_) => compute().map(Arc::new),
        }
    }

    pub fn reset_hits(&self) {
        match self {
            Self::Module(cache) => cache.reset_hits(),
            Self::Null(cache) => cache.reset_hits(),
        }
    }

    pub fn clear_unhit(&self) -> usize {
        match self {
            Self::Module(cache) => cache.clear_unhit(),
            Self::Null(cache) => cache.clear_unhit(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }
}
