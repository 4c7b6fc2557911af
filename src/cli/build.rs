//! `kiln build`: one top-level run.

use crate::cli::RunArgs;
use crate::core::ExitCode;
use crate::engine::Engine;
use crate::log;
use crate::utils::plural::plural_count;

use super::common::{load_config, open_trace, report_config_error};

/// Run every pipeline once and map the outcome to an exit code.
pub fn build(args: &RunArgs) -> ExitCode {
    let config = match load_config(args) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let trace = match open_trace(args, &config) {
        Ok(trace) => trace,
        Err(code) => return code,
    };

    let engine = match Engine::from_config(&config, trace) {
        Ok(engine) => engine,
        Err(err) => {
            report_config_error(&err);
            return ExitCode::ConfigurationError;
        }
    };

    // failures are already traced by the engine
    match engine.execute() {
        Ok(report) => {
            log!(
                "engine";
                "wrote {} to {}",
                plural_count(report.document_count(), "document"),
                engine.output_folder().display()
            );
            ExitCode::Normal
        }
        Err(err) => err.exit_code(),
    }
}
