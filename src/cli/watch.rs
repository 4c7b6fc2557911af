//! `kiln watch`: initial run, then the watch loop.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::EngineConfig;
use crate::core::{self, ExitCode};
use crate::engine::{Engine, EngineError, RunReport};
use crate::logger::{Trace, error_chain, status_error, status_success};
use crate::watch::{EngineDriver, WatchController, WatchSignal, Watchers, spawn_exit_listener};
use crate::{debug, log};

use super::common::{load_config, open_trace, report_config_error};

/// Owns the engine and its watchers on behalf of the control loop.
///
/// At most one engine exists at a time: a rebuild drops the old engine
/// (and every cache it holds) before the new one is configured.
struct CliDriver<'a> {
    args: &'a RunArgs,
    trace: Trace,
    signal: Arc<WatchSignal>,
    engine: Option<Engine>,
    watchers: Option<Watchers>,
}

impl CliDriver<'_> {
    /// Restart the watchers for `config`.
    fn watch(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        self.watchers = None;
        let watchers = Watchers::start(config, &self.signal)
            .map_err(|err| {
                EngineError::Io(config.build.input.clone(), std::io::Error::other(err))
            })?;
        self.watchers = Some(watchers);
        Ok(())
    }
}

impl EngineDriver for CliDriver<'_> {
    fn rebuild(&mut self) -> Result<RunReport, EngineError> {
        drop(self.engine.take());

        let config = EngineConfig::load(self.args).inspect_err(report_config_error)?;
        let engine =
            Engine::from_config(&config, self.trace.clone()).inspect_err(report_config_error)?;
        self.watch(&config)?;

        let engine = self.engine.insert(engine);
        engine.execute()
    }

    fn rerun(&mut self, changed: &[PathBuf]) -> Result<RunReport, EngineError> {
        for path in changed {
            debug!("watch"; "  {}", path.display());
        }
        if let Some(engine) = &self.engine {
            return engine.execute();
        }
        // the last rebuild left no engine behind
        self.rebuild()
    }
}

/// Run once, then keep re-running until Enter or Ctrl+C.
pub fn watch(args: &RunArgs) -> ExitCode {
    let config = match load_config(args) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let trace = match open_trace(args, &config) {
        Ok(trace) => trace,
        Err(code) => return code,
    };
    let engine = match Engine::from_config(&config, trace.clone()) {
        Ok(engine) => engine,
        Err(err) => {
            report_config_error(&err);
            return ExitCode::ConfigurationError;
        }
    };

    let signal = Arc::new(WatchSignal::new());
    core::register_watch(Arc::clone(&signal));

    let mut driver = CliDriver {
        args,
        trace,
        signal: Arc::clone(&signal),
        engine: None,
        watchers: None,
    };
    // watchers first, so changes made during the first run are queued
    if let Err(err) = driver.watch(&config) {
        status_error("cannot watch for changes", &error_chain(&err));
        return err.exit_code();
    }

    let engine = driver.engine.insert(engine);
    match engine.execute() {
        Ok(report) => status_success(&format!(
            "initial run finished in {} ms",
            report.elapsed.as_millis()
        )),
        Err(err) => status_error(
            "initial run failed, waiting for changes",
            &error_chain(&err),
        ),
    }

    spawn_exit_listener(Arc::clone(&signal));
    log!("watch"; "watching {}, press Enter or Ctrl+C to exit", config.build.input.display());

    let mut controller = WatchController::new(signal, driver, config.watch.debounce());
    let code = controller.run();
    if core::is_shutdown() {
        debug!("watch"; "interrupted");
    }
    code
}
