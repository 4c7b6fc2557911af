//! Top-level run errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::core::ExitCode;
use crate::pipeline::PipelineError;

/// Why an engine could not be built or a run failed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Nothing ran: the engine could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A module failed while the run was in progress.
    #[error(transparent)]
    Execution(#[from] PipelineError),

    /// The output folder could not be prepared.
    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

impl EngineError {
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::ConfigurationError,
            Self::Execution(_) | Self::Io(..) => ExitCode::ExecutionError,
        }
    }
}
