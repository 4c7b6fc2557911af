//! `markdown`: render document content from Markdown to HTML.

use std::sync::Arc;

use anyhow::Result;
use pulldown_cmark::{Options, Parser, html};
use rayon::prelude::*;

use super::Module;
use crate::document::{Document, Fingerprint};
use crate::pipeline::ExecutionContext;

/// Markdown renderer with tables, footnotes, strikethrough, task lists and
/// heading attributes enabled.
///
/// Rendered HTML is cached by the fingerprint of the rendered text, so an
/// unchanged document is not re-rendered across runs.
pub struct Markdown {
    options: Options,
}

impl Markdown {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { options }
    }

    fn render(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, self.options);
        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for Markdown {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn process(&self, inputs: Vec<Document>, ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        let cache = ctx.cache();

        let outputs = inputs
            .into_par_iter()
            .map(|doc| {
                let key = Fingerprint::of(doc.content());
                let html = match cache.get::<Arc<str>>(&key) {
                    Some(html) => Arc::clone(&*html),
                    None => {
                        let html: Arc<str> = Arc::from(self.render(doc.content()));
                        cache.put(key, Arc::clone(&html));
                        html
                    }
                };
                doc.with_content(html)
            })
            .collect();
        Ok(outputs)
    }
}
