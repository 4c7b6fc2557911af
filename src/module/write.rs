//! `write`: write document content under the output folder.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::Value;

use super::Module;
use super::pattern::to_slash;
use crate::document::{Document, Fingerprint, keys};
use crate::pipeline::ExecutionContext;

/// Writes each document to `output/<relative_path>`, with the extension
/// replaced when one is configured.
///
/// A document carrying `destination_path` (relative to the output folder)
/// is written there instead. Documents with neither key pass through
/// unwritten. Unchanged documents whose file still exists are not rewritten.
///
/// Written documents get `destination_path` set to where they landed, also
/// relative to the output folder.
pub struct WriteFiles {
    extension: Option<String>,
}

impl WriteFiles {
    pub fn new(extension: Option<String>) -> Self {
        Self {
            extension: extension.map(|ext| ext.trim_start_matches('.').to_string()),
        }
    }

    fn destination(&self, doc: &Document, output: &Path) -> Option<PathBuf> {
        if let Some(dest) = doc.get_str(keys::DESTINATION_PATH) {
            return Some(output.join(dest));
        }
        let relative = doc.get_str(keys::RELATIVE_PATH)?;
        let mut dest = output.join(relative);
        if let Some(ext) = &self.extension {
            dest.set_extension(ext);
        }
        Some(dest)
    }
}

impl Module for WriteFiles {
    fn name(&self) -> &'static str {
        "write"
    }

    fn process(&self, inputs: Vec<Document>, ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        let output = ctx.output_folder();
        let cache = ctx.cache();

        inputs
            .into_par_iter()
            .map(|doc| -> Result<Document> {
                let Some(dest) = self.destination(&doc, output) else {
                    ctx.trace().verbose("write", "skipping document without a path");
                    return Ok(doc);
                };

                let key = Fingerprint::builder()
                    .part(dest.to_string_lossy().as_bytes())
                    .part(doc.content())
                    .finish();
                let unchanged = cache.get::<()>(&key).is_some() && dest.exists();
                if !unchanged {
                    write_file(&dest, doc.content())?;
                    cache.put(key, ());
                }

                let relative = dest.strip_prefix(output).unwrap_or(dest.as_path());
                Ok(doc.with_metadata([(
                    keys::DESTINATION_PATH,
                    Value::String(to_slash(relative)),
                )]))
            })
            .collect()
    }
}

fn write_file(dest: &Path, content: &str) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(dest, content).with_context(|| format!("failed to write {}", dest.display()))
}
