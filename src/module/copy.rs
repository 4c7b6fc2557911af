//! `copy`: copy matching input files verbatim to the output folder.

use std::fs;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::Value;

use super::pattern::{FilePattern, to_slash};
use super::read::file_metadata;
use super::Module;
use crate::document::{Document, Fingerprint, keys};
use crate::pipeline::ExecutionContext;

/// Copies files matching a pattern, keeping their relative layout.
///
/// Keyed by relative path and file content: a file already copied in an
/// earlier run is skipped while its destination still exists.
pub struct CopyFiles {
    pattern: FilePattern,
}

impl CopyFiles {
    pub fn new(pattern: FilePattern) -> Self {
        Self { pattern }
    }
}

impl Module for CopyFiles {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn process(&self, inputs: Vec<Document>, ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        let root = ctx.input_folder();
        let output = ctx.output_folder();
        let cache = ctx.cache();
        let files = self.pattern.collect(root, output);

        let copied: Vec<_> = files
            .par_iter()
            .map(|path| -> Result<_> {
                let relative = path.strip_prefix(root).unwrap_or(path);
                let dest = output.join(relative);
                let bytes =
                    fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
                let key = Fingerprint::builder()
                    .part(relative.to_string_lossy().as_bytes())
                    .part(&bytes)
                    .finish();

                if cache.get::<()>(&key).is_none() || !dest.exists() {
                    if let Some(parent) = dest.parent() {
                        fs::create_dir_all(parent)
                            .with_context(|| format!("failed to create {}", parent.display()))?;
                    }
                    fs::write(&dest, &bytes)
                        .with_context(|| format!("failed to copy to {}", dest.display()))?;
                    cache.put(key, ());
                }

                let mut metadata = file_metadata(root, path);
                metadata.push((keys::DESTINATION_PATH, Value::String(to_slash(relative))));
                Ok((path.clone(), metadata))
            })
            .collect::<Result<_>>()?;

        ctx.trace()
            .verbose("copy", format!("{} file(s) match `{}`", copied.len(), self.pattern.as_str()));

        let mut outputs = Vec::with_capacity(inputs.len() * copied.len());
        for input in &inputs {
            for (path, metadata) in &copied {
                outputs.push(input.derive(
                    Some(path.clone()),
                    Some("".into()),
                    metadata.iter().cloned(),
                ));
            }
        }
        Ok(outputs)
    }
}
