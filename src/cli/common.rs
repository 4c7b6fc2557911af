//! Setup shared by the build and watch commands.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cli::RunArgs;
use crate::config::{ConfigError, EngineConfig};
use crate::core::ExitCode;
use crate::logger::{self, Trace};
use crate::{critical, log};

/// Load the configuration, reporting failures.
pub fn load_config(args: &RunArgs) -> Result<EngineConfig, ExitCode> {
    EngineConfig::load(args).map_err(|err| {
        report_config_error(&err);
        ExitCode::ConfigurationError
    })
}

pub fn report_config_error(err: &ConfigError) {
    critical!("config"; "{}", logger::error_chain(err));
}

/// Build the trace sink, attaching a log file when `--log` was given.
pub fn open_trace(args: &RunArgs, config: &EngineConfig) -> Result<Trace, ExitCode> {
    logger::set_verbose(args.verbose);

    let Some(log) = &args.log else {
        return Ok(Trace::new());
    };
    let path = log.clone().unwrap_or_else(|| config.root.join(default_log_name()));

    match Trace::new().with_log_file(&path) {
        Ok(trace) => {
            log!("engine"; "logging to {}", path.display());
            Ok(trace)
        }
        Err(err) => {
            critical!("error"; "cannot open log file {}: {}", path.display(), err);
            Err(ExitCode::CommandLineError)
        }
    }
}

fn default_log_name() -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!("kiln-{secs}.log"))
}
