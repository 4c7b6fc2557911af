//! Immutable, metadata-bearing documents.
//!
//! Documents are never mutated in place. Every transformation derives a new
//! document that shares unchanged parts with its parent through `Arc`.

mod fingerprint;

pub use fingerprint::{Fingerprint, FingerprintBuilder};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

/// Ordered metadata (insertion order is preserved).
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata keys written by the built-in modules.
pub mod keys {
    pub const SOURCE_PATH: &str = "source_path";
    pub const RELATIVE_PATH: &str = "relative_path";
    pub const FILE_NAME: &str = "file_name";
    pub const FILE_STEM: &str = "file_stem";
    pub const EXTENSION: &str = "extension";
    pub const DESTINATION_PATH: &str = "destination_path";
}

#[derive(Debug)]
struct Inner {
    source: Option<PathBuf>,
    content: Arc<str>,
    metadata: Arc<Metadata>,
}

/// A content document flowing through a pipeline.
///
/// Cloning is cheap: the clone refers to the same immutable data.
#[derive(Debug, Clone)]
pub struct Document {
    inner: Arc<Inner>,
}

impl Document {
    pub fn new(source: Option<PathBuf>, content: impl Into<Arc<str>>, metadata: Metadata) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                content: content.into(),
                metadata: Arc::new(metadata),
            }),
        }
    }

    /// Fresh start-of-pipeline document carrying the engine's initial metadata.
    pub fn seed(metadata: &Metadata) -> Self {
        Self::new(None, "", metadata.clone())
    }

    pub fn source(&self) -> Option<&Path> {
        self.inner.source.as_deref()
    }

    pub fn content(&self) -> &str {
        &self.inner.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.inner.metadata
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.metadata.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.metadata.contains_key(key)
    }

    /// Derive a document with new content, keeping source and metadata.
    pub fn with_content(&self, content: impl Into<Arc<str>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source: self.inner.source.clone(),
                content: content.into(),
                metadata: Arc::clone(&self.inner.metadata),
            }),
        }
    }

    /// Derive a document with added or overridden metadata entries.
    pub fn with_metadata<I, K>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.derive(None, None, entries)
    }

    /// Derive a document, optionally replacing source and content, and
    /// overriding metadata entries.
    pub fn derive<I, K>(
        &self,
        source: Option<PathBuf>,
        content: Option<Arc<str>>,
        entries: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut entries = entries.into_iter().peekable();
        let metadata = if entries.peek().is_none() {
            Arc::clone(&self.inner.metadata)
        } else {
            let mut metadata = (*self.inner.metadata).clone();
            for (key, value) in entries {
                metadata.insert(key.into(), value);
            }
            Arc::new(metadata)
        };

        Self {
            inner: Arc::new(Inner {
                source: source.or_else(|| self.inner.source.clone()),
                content: content.unwrap_or_else(|| Arc::clone(&self.inner.content)),
                metadata,
            }),
        }
    }

    /// Fingerprint over source, content and metadata.
    ///
    /// This is the cache key the built-in per-document modules use.
    pub fn fingerprint(&self) -> Fingerprint {
        let source = self
            .inner
            .source
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = serde_json::to_string(&*self.inner.metadata).unwrap_or_default();

        Fingerprint::builder()
            .part(source)
            .part(self.content())
            .part(metadata)
            .finish()
    }

    /// True if both handles refer to the same underlying document.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
