//! Executes an ordered module list over a document set.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use anyhow::anyhow;

use super::context::{CompletedStage, ExecutionContext, RunScope};
use super::error::PipelineError;
use crate::document::Document;
use crate::module::ModuleHandle;

/// Threads documents through modules in order.
///
/// The output of module *i* is the input of module *i + 1*. After each module
/// finishes its documents are recorded as a completed stage, visible to every
/// later module through `ExecutionContext::completed`.
pub struct PipelineRunner<'a> {
    scope: RunScope<'a>,
    pipeline: &'a str,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(scope: RunScope<'a>, pipeline: &'a str) -> Self {
        Self { scope, pipeline }
    }

    /// Run `modules` over `inputs`, or over a fresh seed document if `None`.
    ///
    /// The first failing module aborts the run; later modules do not execute.
    pub fn execute(
        &self,
        modules: &[ModuleHandle],
        inputs: Option<Vec<Document>>,
    ) -> Result<Vec<Document>, PipelineError> {
        let trace = self.scope.trace;
        let mut documents =
            inputs.unwrap_or_else(|| vec![Document::seed(self.scope.initial_metadata)]);
        let mut completed: Vec<CompletedStage> = Vec::with_capacity(modules.len());

        for (index, module) in modules.iter().enumerate() {
            trace.verbose(
                "pipeline",
                format!(
                    "{}: executing {} with {} input(s)",
                    self.pipeline,
                    module.name(),
                    documents.len()
                ),
            );
            let started = Instant::now();

            let output = {
                let ctx = ExecutionContext {
                    scope: self.scope,
                    pipeline: self.pipeline,
                    module,
                    completed: &completed,
                };
                run_module(module, documents, &ctx)
            };

            let output = output.map_err(|error| PipelineError::Module {
                pipeline: self.pipeline.to_string(),
                stage: index,
                module: module.name(),
                error,
            })?;

            trace.verbose(
                "pipeline",
                format!(
                    "{}: {} produced {} output(s) in {} ms",
                    self.pipeline,
                    module.name(),
                    output.len(),
                    started.elapsed().as_millis()
                ),
            );

            completed.push(CompletedStage {
                index,
                module: module.name(),
                documents: output.clone(),
            });
            documents = output;
        }

        Ok(documents)
    }
}

/// Run one module, turning a panic into an error so the engine survives it.
fn run_module(
    module: &ModuleHandle,
    inputs: Vec<Document>,
    ctx: &ExecutionContext<'_>,
) -> anyhow::Result<Vec<Document>> {
    panic::catch_unwind(AssertUnwindSafe(|| module.process(inputs, ctx)))
        .unwrap_or_else(|payload| Err(anyhow!("module panicked: {}", panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
