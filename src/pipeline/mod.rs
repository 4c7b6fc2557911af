//! Pipeline orchestration.
//!
//! # Architecture
//!
//! ```text
//! Engine::execute
//!   └─ for each Pipeline (in order)
//!        └─ PipelineRunner::execute(modules, None)
//!             seed ─▶ module 0 ─▶ module 1 ─▶ ... ─▶ output
//!                        │           │
//!                        └─ completed stages, visible to later modules
//! ```

mod context;
mod error;
mod runner;


pub use context::{CompletedStage, ExecutionContext, PipelineOutput, RunScope};
pub use error::PipelineError;
pub use runner::PipelineRunner;

use crate::module::ModuleHandle;

/// A named, ordered module list.
pub struct Pipeline {
    name: String,
    modules: Vec<ModuleHandle>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, modules: Vec<ModuleHandle>) -> Self {
        Self {
            name: name.into(),
            modules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modules(&self) -> &[ModuleHandle] {
        &self.modules
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.modules.iter().map(ModuleHandle::name).collect();
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("modules", &names)
            .finish()
    }
}
