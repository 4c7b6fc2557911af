//! Watch mode: the debounced control loop.
//!
//! The loop blocks on a single `WatchSignal`. On every wake it decides
//! between three outcomes, in priority order:
//!
//! | pending state   | action                                              |
//! |-----------------|-----------------------------------------------------|
//! | exit requested  | leave the loop, watchers are released                |
//! | new engine      | rebuild the engine, full run, discard pending paths  |
//! | changed paths   | one run of the current engine (no rebuild)           |
//!
//! A wake with nothing pending re-arms and waits again.

mod filter;
mod signal;
mod watcher;


pub use filter::{InputFilter, touches_config};
pub use signal::WatchSignal;
pub use watcher::{Watchers, spawn_exit_listener};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::ExitCode;
use crate::engine::{EngineError, RunReport};
use crate::logger::{error_chain, status_error, status_success};
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// What the control loop needs from whoever owns the engine.
pub trait EngineDriver {
    /// Tear down the current engine, build a new one from the current
    /// configuration and run it once.
    fn rebuild(&mut self) -> Result<RunReport, EngineError>;

    /// Run the current engine again after `changed` paths changed.
    fn rerun(&mut self, changed: &[PathBuf]) -> Result<RunReport, EngineError>;
}

/// Outcome of handling one wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(ExitCode),
}

pub struct WatchController<D> {
    signal: Arc<WatchSignal>,
    driver: D,
    debounce: Duration,
}

impl<D: EngineDriver> WatchController<D> {
    pub fn new(signal: Arc<WatchSignal>, driver: D, debounce: Duration) -> Self {
        Self {
            signal,
            driver,
            debounce,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Run until exit is requested or a rebuild fails.
    pub fn run(&mut self) -> ExitCode {
        loop {
            self.signal.wait();
            self.signal.settle(self.debounce);

            if let Flow::Exit(code) = self.handle_wake() {
                return code;
            }
            // exit wins over anything that arrived during the run
            if self.signal.is_exit_requested() {
                return ExitCode::Normal;
            }
        }
    }

    /// Handle one wake of the signal.
    pub fn handle_wake(&mut self) -> Flow {
        if self.signal.is_exit_requested() {
            return Flow::Exit(ExitCode::Normal);
        }

        if self.signal.take_new_engine() {
            log!("watch"; "configuration changed, rebuilding engine");
            let result = self.driver.rebuild();
            // a full run subsumes any pending incremental change
            let discarded = self.signal.drain_changed();
            if !discarded.is_empty() {
                debug!("watch"; "discarded {}", plural_count(discarded.len(), "pending change"));
            }

            return match result {
                Ok(report) => {
                    report_success(&report);
                    Flow::Continue
                }
                Err(err) => {
                    status_error("engine rebuild failed, exiting", &error_chain(&err));
                    Flow::Exit(err.exit_code())
                }
            };
        }

        let changed = self.signal.drain_changed();
        if changed.is_empty() {
            return Flow::Continue;
        }

        log!("watch"; "{} changed, re-running", plural_count(changed.len(), "file"));
        match self.driver.rerun(&changed) {
            Ok(report) => report_success(&report),
            Err(err) => status_error("run failed, waiting for changes", &error_chain(&err)),
        }
        Flow::Continue
    }
}

fn report_success(report: &RunReport) {
    status_success(&format!(
        "{} in {} ms",
        plural_count(report.document_count(), "document"),
        report.elapsed.as_millis()
    ));
}
