//! Pipeline modules.
//!
//! A module is a configured unit of transformation executed over and over
//! across runs. Each instance gets its own `ModuleId`, which is also its
//! cache namespace: two `markdown` modules never share cached results.
//!
//! Built-in modules:
//!
//! | kind           | effect                                                |
//! |----------------|-------------------------------------------------------|
//! | `read`         | one document per input file matching a pattern        |
//! | `front_matter` | TOML block at the top of content becomes metadata     |
//! | `markdown`     | render content from Markdown to HTML                  |
//! | `meta`         | set one metadata entry on every document              |
//! | `concat`       | append the output of child modules to the inputs      |
//! | `documents`    | documents of an earlier pipeline or stage             |
//! | `write`        | write content under the output folder                 |
//! | `copy`         | copy matching input files verbatim                    |

mod concat;
mod copy;
mod documents;
mod front_matter;
mod markdown;
mod meta;
mod pattern;
mod read;
mod write;

pub use concat::Concat;
pub use copy::CopyFiles;
pub use documents::{DocumentSource, Documents};
pub use front_matter::FrontMatter;
pub use markdown::Markdown;
pub use meta::Meta;
pub use pattern::FilePattern;
pub use read::ReadFiles;
pub use write::WriteFiles;

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;

use crate::config::{ConfigError, ModuleSpec};
use crate::document::Document;
use crate::pipeline::ExecutionContext;

/// A transformation stage.
///
/// Implementations must be free of caching side effects: whether a cached
/// value may be reused is decided only by its fingerprint.
pub trait Module: Send + Sync {
    /// Short type name, used in traces and cache reports.
    fn name(&self) -> &'static str;

    fn process(&self, inputs: Vec<Document>, ctx: &ExecutionContext<'_>) -> Result<Vec<Document>>;
}

/// Stable handle of one module instance within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocates module ids while pipelines are constructed.
#[derive(Debug, Default)]
pub struct ModuleIds {
    next: AtomicU32,
}

impl ModuleIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> ModuleId {
        ModuleId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// A module instance together with its id.
pub struct ModuleHandle {
    id: ModuleId,
    module: Box<dyn Module>,
}

impl ModuleHandle {
    pub fn new(ids: &ModuleIds, module: impl Module + 'static) -> Self {
        Self {
            id: ids.next(),
            module: Box::new(module),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.module.name()
    }

    pub fn process(
        &self,
        inputs: Vec<Document>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<Document>> {
        self.module.process(inputs, ctx)
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.id)
    }
}

/// Instantiate a configured module (and its children) with fresh ids.
pub fn build(spec: &ModuleSpec, ids: &ModuleIds) -> Result<ModuleHandle, ConfigError> {
    let handle = match spec {
        ModuleSpec::Read { pattern, exclude } => {
            ModuleHandle::new(ids, ReadFiles::new(FilePattern::parse(pattern, exclude.as_deref())?))
        }
        ModuleSpec::FrontMatter { delimiter } => {
            ModuleHandle::new(ids, FrontMatter::new(delimiter))
        }
        ModuleSpec::Markdown => ModuleHandle::new(ids, Markdown::new()),
        ModuleSpec::Meta { key, value } => ModuleHandle::new(ids, Meta::new(key, value.clone())),
        ModuleSpec::Concat { modules } => {
            let children = build_all(modules, ids)?;
            ModuleHandle::new(ids, Concat::new(children))
        }
        ModuleSpec::Documents { pipeline, stage } => {
            let source = match (pipeline, stage) {
                (Some(name), None) => DocumentSource::Pipeline(name.clone()),
                (None, Some(index)) => DocumentSource::Stage(*index),
                _ => {
                    return Err(ConfigError::Validation(
                        "`documents` needs exactly one of `pipeline` or `stage`".into(),
                    ));
                }
            };
            ModuleHandle::new(ids, Documents::new(source))
        }
        ModuleSpec::Write { extension } => {
            ModuleHandle::new(ids, WriteFiles::new(extension.clone()))
        }
        ModuleSpec::Copy { pattern, exclude } => {
            ModuleHandle::new(ids, CopyFiles::new(FilePattern::parse(pattern, exclude.as_deref())?))
        }
    };
    Ok(handle)
}

/// Instantiate a module list in order.
pub fn build_all(specs: &[ModuleSpec], ids: &ModuleIds) -> Result<Vec<ModuleHandle>, ConfigError> {
    specs.iter().map(|spec| build(spec, ids)).collect()
}
