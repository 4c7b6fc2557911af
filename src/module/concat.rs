//! `concat`: append the output of child modules to the inputs.

use anyhow::Result;

use super::{Module, ModuleHandle};
use crate::document::Document;
use crate::pipeline::ExecutionContext;

/// Runs its children from a fresh seed document and appends their output.
///
/// Children are ordinary module instances with their own ids and caches.
pub struct Concat {
    children: Vec<ModuleHandle>,
}

impl Concat {
    pub fn new(children: Vec<ModuleHandle>) -> Self {
        Self { children }
    }
}

impl Module for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn process(
        &self,
        mut inputs: Vec<Document>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<Document>> {
        let appended = ctx.execute(&self.children, None)?;
        inputs.extend(appended);
        Ok(inputs)
    }
}
