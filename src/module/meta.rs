//! `meta`: set one metadata entry on every document.

use anyhow::Result;
use serde_json::Value;

use super::Module;
use crate::document::Document;
use crate::pipeline::ExecutionContext;

pub struct Meta {
    key: String,
    value: Value,
}

impl Meta {
    pub fn new(key: &str, value: Value) -> Self {
        Self {
            key: key.to_string(),
            value,
        }
    }
}

impl Module for Meta {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn process(&self, inputs: Vec<Document>, _ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        Ok(inputs
            .iter()
            .map(|doc| doc.with_metadata([(self.key.as_str(), self.value.clone())]))
            .collect())
    }
}
