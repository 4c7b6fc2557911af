//! `read`: one document per matching input file.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::Value;

use super::pattern::{FilePattern, to_slash};
use super::Module;
use crate::document::{Document, keys};
use crate::pipeline::ExecutionContext;

/// Reads files under the input folder.
///
/// Every input document is combined with every matching file, so a single
/// seed document yields one output per file. Files are always read from
/// disk; downstream modules decide what to reuse by fingerprint.
pub struct ReadFiles {
    pattern: FilePattern,
}

impl ReadFiles {
    pub fn new(pattern: FilePattern) -> Self {
        Self { pattern }
    }
}

impl Module for ReadFiles {
    fn name(&self) -> &'static str {
        "read"
    }

    fn process(&self, inputs: Vec<Document>, ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        let root = ctx.input_folder();
        let files = self.pattern.collect(root, ctx.output_folder());
        ctx.trace().verbose(
            "read",
            format!("{} file(s) match `{}`", files.len(), self.pattern.as_str()),
        );

        let loaded: Vec<(Arc<str>, _)> = files
            .par_iter()
            .map(|path| -> Result<_> {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok((Arc::<str>::from(content), file_metadata(root, path)))
            })
            .collect::<Result<_>>()?;

        let mut outputs = Vec::with_capacity(inputs.len() * loaded.len());
        for input in &inputs {
            for ((content, metadata), path) in loaded.iter().zip(&files) {
                outputs.push(input.derive(
                    Some(path.clone()),
                    Some(Arc::clone(content)),
                    metadata.iter().cloned(),
                ));
            }
        }
        Ok(outputs)
    }
}

/// Path-derived metadata for a file under `root`.
pub(super) fn file_metadata(root: &Path, path: &Path) -> Vec<(&'static str, Value)> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let text = |s: Option<&std::ffi::OsStr>| {
        Value::String(s.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default())
    };

    vec![
        (keys::SOURCE_PATH, Value::String(path.to_string_lossy().into_owned())),
        (keys::RELATIVE_PATH, Value::String(to_slash(relative))),
        (keys::FILE_NAME, text(path.file_name())),
        (keys::FILE_STEM, text(path.file_stem())),
        (keys::EXTENSION, text(path.extension())),
    ]
}
