//! `front_matter`: lift a leading TOML block into metadata.
//!
//! ```text
//! +++
//! title = "Hello"
//! tags = ["a", "b"]
//! +++
//! body starts here
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;

use super::Module;
use crate::document::{Document, Fingerprint, Metadata};
use crate::pipeline::ExecutionContext;

/// Parsed front matter of one document.
struct Parsed {
    metadata: Metadata,
    body: Arc<str>,
}

pub struct FrontMatter {
    delimiter: String,
}

impl FrontMatter {
    pub fn new(delimiter: &str) -> Self {
        Self {
            delimiter: delimiter.to_string(),
        }
    }

    fn parse(&self, content: &str) -> Result<Option<Parsed>> {
        let Some((block, body)) = split_front_matter(content, &self.delimiter) else {
            return Ok(None);
        };
        let metadata: Metadata = toml::from_str(block).context("invalid front matter")?;
        Ok(Some(Parsed {
            metadata,
            body: Arc::from(body),
        }))
    }
}

impl Module for FrontMatter {
    fn name(&self) -> &'static str {
        "front_matter"
    }

    fn process(&self, inputs: Vec<Document>, ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        let cache = ctx.cache();

        inputs
            .into_par_iter()
            .map(|doc| -> Result<Document> {
                let key = Fingerprint::builder()
                    .part(&self.delimiter)
                    .fingerprint(doc.fingerprint())
                    .finish();
                let parsed = cache
                    .get_or_compute(key, || self.parse(doc.content()))
                    .with_context(|| match doc.source() {
                        Some(path) => format!("in {}", path.display()),
                        None => "in generated document".to_string(),
                    })?;

                Ok(match parsed.as_ref() {
                    Some(parsed) => doc.derive(
                        None,
                        Some(Arc::clone(&parsed.body)),
                        parsed.metadata.iter().map(|(k, v)| (k.clone(), v.clone())),
                    ),
                    None => doc,
                })
            })
            .collect()
    }
}

/// Split `content` into (front matter block, body) if it opens with `delimiter`.
fn split_front_matter<'a>(content: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content.strip_prefix(delimiter)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == delimiter {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((block, body));
        }
        offset += line.len();
    }
    None
}
