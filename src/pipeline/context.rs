//! What a module sees while it runs.

use std::path::Path;

use crate::cache::{CacheHandle, CacheRegistry};
use crate::document::{Document, Metadata};
use crate::logger::Trace;
use crate::module::ModuleHandle;

use super::PipelineRunner;

/// Documents produced by one finished stage.
#[derive(Debug, Clone)]
pub struct CompletedStage {
    /// Position of the module in its module list.
    pub index: usize,
    pub module: &'static str,
    pub documents: Vec<Document>,
}

/// Final documents of a pipeline that already finished in this run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub name: String,
    pub documents: Vec<Document>,
}

/// Engine state shared by every module of one pipeline pass.
#[derive(Clone, Copy)]
pub struct RunScope<'a> {
    pub trace: &'a Trace,
    pub caches: &'a CacheRegistry,
    pub initial_metadata: &'a Metadata,
    pub input_folder: &'a Path,
    pub output_folder: &'a Path,
    /// Pipelines completed earlier in this run, in execution order.
    pub outputs: &'a [PipelineOutput],
}

/// Execution context handed to `Module::process`.
pub struct ExecutionContext<'a> {
    pub(super) scope: RunScope<'a>,
    pub(super) pipeline: &'a str,
    pub(super) module: &'a ModuleHandle,
    pub(super) completed: &'a [CompletedStage],
}

impl<'a> ExecutionContext<'a> {
    pub fn trace(&self) -> &'a Trace {
        self.scope.trace
    }

    /// Name of the pipeline being executed.
    pub fn pipeline(&self) -> &'a str {
        self.pipeline
    }

    /// Stages completed so far in the current module list, oldest first.
    pub fn completed(&self) -> &'a [CompletedStage] {
        self.completed
    }

    /// Output of an earlier pipeline of this run, by name.
    pub fn pipeline_output(&self, name: &str) -> Option<&'a [Document]> {
        self.scope
            .outputs
            .iter()
            .find(|output| output.name == name)
            .map(|output| output.documents.as_slice())
    }

    /// Cache of the module currently executing.
    pub fn cache(&self) -> CacheHandle {
        self.scope
            .caches
            .get_or_create(self.module.id(), self.module.name())
    }

    pub fn initial_metadata(&self) -> &'a Metadata {
        self.scope.initial_metadata
    }

    pub fn input_folder(&self) -> &'a Path {
        self.scope.input_folder
    }

    pub fn output_folder(&self) -> &'a Path {
        self.scope.output_folder
    }

    /// Run a nested module list with the same engine state.
    ///
    /// `None` inputs start from a fresh seed document. The nested run keeps
    /// its own completed stages.
    pub fn execute(
        &self,
        modules: &[ModuleHandle],
        inputs: Option<Vec<Document>>,
    ) -> anyhow::Result<Vec<Document>> {
        let runner = PipelineRunner::new(self.scope, self.pipeline);
        Ok(runner.execute(modules, inputs)?)
    }
}
