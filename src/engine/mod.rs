//! The engine: configured pipelines plus the state that outlives a run.
//!
//! One engine instance owns one `CacheRegistry`. A configuration change
//! replaces the engine (and with it every cache) instead of patching it.
//!
//! # Top-level run
//!
//! ```text
//! execute()
//!   ├─ reset_all_hits          every cached entry starts the run unhit
//!   ├─ clean output folder     unless disabled
//!   ├─ pipeline 0..n           PipelineRunner, outputs visible to later pipelines
//!   └─ prune_all               always, also after a failed pipeline
//! ```

mod error;

#[cfg(test)]
mod tests;

pub use error::EngineError;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::cache::CacheRegistry;
use crate::config::{ConfigError, EngineConfig};
use crate::document::{Document, Metadata};
use crate::logger::{Trace, error_chain};
use crate::module::{self, ModuleIds};
use crate::pipeline::{Pipeline, PipelineOutput, PipelineRunner, RunScope};
use crate::utils::plural::plural_count;

/// Folders and switches an engine is created with.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub clean: bool,
    pub no_cache: bool,
    pub initial_metadata: Metadata,
}

impl EngineSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            root: config.root.clone(),
            input: config.build.input.clone(),
            output: config.build.output.clone(),
            clean: config.build.clean,
            no_cache: !config.build.cache,
            initial_metadata: config.meta.clone(),
        }
    }
}

/// Result of a successful top-level run.
#[derive(Debug)]
pub struct RunReport {
    /// Final documents per pipeline, in execution order.
    pub outputs: Vec<PipelineOutput>,
    /// Stale cache entries removed at the end of the run.
    pub pruned: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn documents(&self, pipeline: &str) -> Option<&[Document]> {
        self.outputs
            .iter()
            .find(|output| output.name == pipeline)
            .map(|output| output.documents.as_slice())
    }

    pub fn document_count(&self) -> usize {
        self.outputs.iter().map(|output| output.documents.len()).sum()
    }
}

pub struct Engine {
    settings: EngineSettings,
    trace: Trace,
    caches: CacheRegistry,
    ids: ModuleIds,
    pipelines: Vec<Pipeline>,
}

impl Engine {
    pub fn new(settings: EngineSettings, trace: Trace) -> Self {
        let caches = CacheRegistry::with_disabled(settings.no_cache);
        Self {
            settings,
            trace,
            caches,
            ids: ModuleIds::new(),
            pipelines: Vec::new(),
        }
    }

    /// Build and configure an engine in one step.
    pub fn from_config(config: &EngineConfig, trace: Trace) -> Result<Self, ConfigError> {
        let mut engine = Self::new(EngineSettings::from_config(config), trace);
        engine.configure(config)?;
        Ok(engine)
    }

    /// Replace the pipelines with the ones `config` declares.
    ///
    /// On error the engine keeps its previous pipelines.
    pub fn configure(&mut self, config: &EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;

        let pipelines = config
            .pipelines
            .iter()
            .map(|spec| {
                let modules = module::build_all(&spec.modules, &self.ids)?;
                Ok(Pipeline::new(spec.name.clone(), modules))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        self.trace.verbose(
            "engine",
            format!("configured {}", plural_count(pipelines.len(), "pipeline")),
        );
        self.pipelines = pipelines;
        Ok(())
    }

    /// Append a pipeline built by hand (module ids come from `ids()`).
    pub fn add_pipeline(&mut self, pipeline: Pipeline) {
        self.pipelines.push(pipeline);
    }

    pub fn set_no_cache(&mut self, no_cache: bool) {
        self.settings.no_cache = no_cache;
        self.caches.set_disabled(no_cache);
    }

    pub fn ids(&self) -> &ModuleIds {
        &self.ids
    }

    pub fn caches(&self) -> &CacheRegistry {
        &self.caches
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn root(&self) -> &Path {
        &self.settings.root
    }

    pub fn input_folder(&self) -> &Path {
        &self.settings.input
    }

    pub fn output_folder(&self) -> &Path {
        &self.settings.output
    }

    /// One top-level run over every pipeline.
    ///
    /// Cache pruning happens exactly once per call, whether or not a
    /// pipeline failed, so a failed run never pins stale entries.
    pub fn execute(&self) -> Result<RunReport, EngineError> {
        let started = Instant::now();
        self.caches.reset_all_hits();

        let result = self.run_pipelines();
        let pruned = self.prune_caches();

        match result {
            Ok(outputs) => {
                let elapsed = started.elapsed();
                self.trace.information(
                    "engine",
                    format!(
                        "executed {} in {} ms",
                        plural_count(outputs.len(), "pipeline"),
                        elapsed.as_millis()
                    ),
                );
                Ok(RunReport {
                    outputs,
                    pruned,
                    elapsed,
                })
            }
            Err(err) => {
                self.trace.critical("engine", error_chain(&err));
                Err(err)
            }
        }
    }

    fn run_pipelines(&self) -> Result<Vec<PipelineOutput>, EngineError> {
        self.prepare_output()?;

        let mut outputs: Vec<PipelineOutput> = Vec::with_capacity(self.pipelines.len());
        for pipeline in &self.pipelines {
            let started = Instant::now();
            let scope = RunScope {
                trace: &self.trace,
                caches: &self.caches,
                initial_metadata: &self.settings.initial_metadata,
                input_folder: &self.settings.input,
                output_folder: &self.settings.output,
                outputs: &outputs,
            };
            let documents =
                PipelineRunner::new(scope, pipeline.name()).execute(pipeline.modules(), None)?;

            self.trace.verbose(
                "engine",
                format!(
                    "pipeline {} finished with {} in {} ms",
                    pipeline.name(),
                    plural_count(documents.len(), "document"),
                    started.elapsed().as_millis()
                ),
            );
            outputs.push(PipelineOutput {
                name: pipeline.name().to_string(),
                documents,
            });
        }
        Ok(outputs)
    }

    /// Clean (if enabled) and create the output folder.
    fn prepare_output(&self) -> Result<(), EngineError> {
        let output = &self.settings.output;
        let io_err = |err: std::io::Error| EngineError::Io(output.clone(), err);

        if self.settings.clean && output.is_dir() {
            self.trace
                .verbose("engine", format!("cleaning {}", output.display()));
            for entry in fs::read_dir(output).map_err(io_err)? {
                let path = entry.map_err(io_err)?.path();
                if path.is_dir() {
                    fs::remove_dir_all(&path).map_err(io_err)?;
                } else {
                    fs::remove_file(&path).map_err(io_err)?;
                }
            }
        }
        fs::create_dir_all(output).map_err(io_err)
    }

    fn prune_caches(&self) -> usize {
        let trace = &self.trace;
        let removed = self.caches.prune_all(|report| {
            if report.removed > 0 {
                trace.verbose(
                    "cache",
                    format!(
                        "removed {} stale cache entr{} for module {}{}",
                        report.removed,
                        if report.removed == 1 { "y" } else { "ies" },
                        report.name,
                        report.module
                    ),
                );
            }
        });
        if removed > 0 {
            trace.verbose(
                "cache",
                format!("{} cached entries remain", self.caches.entry_count()),
            );
        }
        removed
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("pipelines", &self.pipelines)
            .field("caches", &self.caches.len())
            .finish()
    }
}
