//! Pipeline execution errors.

use thiserror::Error;

/// A pipeline run aborted by a failing module.
// NOTE: `error` is not a #[source]; its chain is already in the message
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline `{pipeline}` failed in module `{module}` (stage {stage}): {error:#}")]
    Module {
        pipeline: String,
        stage: usize,
        module: &'static str,
        error: anyhow::Error,
    },
}

impl PipelineError {
    pub fn pipeline(&self) -> &str {
        match self {
            Self::Module { pipeline, .. } => pipeline,
        }
    }

    pub fn stage(&self) -> usize {
        match self {
            Self::Module { stage, .. } => *stage,
        }
    }
}
