//! `documents`: pull in documents produced earlier in the run.

use anyhow::{Result, bail};

use super::Module;
use crate::document::Document;
use crate::pipeline::ExecutionContext;

/// Where `documents` takes its output from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Final output of an earlier pipeline in this run.
    Pipeline(String),
    /// Output of an earlier stage (by index) of the current module list.
    Stage(usize),
}

/// Replaces its inputs with documents from an earlier pipeline or stage.
///
/// This is how an aggregating module reaches state several stages back,
/// not only its direct predecessor's output.
pub struct Documents {
    source: DocumentSource,
}

impl Documents {
    pub fn new(source: DocumentSource) -> Self {
        Self { source }
    }
}

impl Module for Documents {
    fn name(&self) -> &'static str {
        "documents"
    }

    fn process(&self, _inputs: Vec<Document>, ctx: &ExecutionContext<'_>) -> Result<Vec<Document>> {
        match &self.source {
            DocumentSource::Pipeline(name) => match ctx.pipeline_output(name) {
                Some(documents) => Ok(documents.to_vec()),
                None => bail!("pipeline `{name}` has not run before `{}`", ctx.pipeline()),
            },
            DocumentSource::Stage(index) => match ctx.completed().get(*index) {
                Some(stage) => Ok(stage.documents.clone()),
                None => bail!(
                    "stage {index} has not completed yet ({} stage(s) done)",
                    ctx.completed().len()
                ),
            },
        }
    }
}
