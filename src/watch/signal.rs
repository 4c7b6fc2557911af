//! The single wake-up primitive of the watch loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashSet;

/// Auto-reset event plus the state listeners hand to the control loop.
///
/// Listener threads only push and set flags; the control loop is the only
/// consumer. Changed paths are drained in bulk, so a burst of events
/// coalesces into one run.
#[derive(Debug, Default)]
pub struct WatchSignal {
    woken: Mutex<bool>,
    condvar: Condvar,
    changed: SegQueue<PathBuf>,
    exit: AtomicBool,
    new_engine: AtomicBool,
}

impl WatchSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// An input file changed.
    pub fn notify_changed(&self, path: PathBuf) {
        self.changed.push(path);
        self.set();
    }

    /// The configuration changed; the engine must be rebuilt.
    pub fn notify_config_changed(&self) {
        self.new_engine.store(true, Ordering::SeqCst);
        self.set();
    }

    /// Ask the loop to exit at the next check.
    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
        self.set();
    }

    pub fn is_exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    /// Consume the "need new engine" flag.
    pub fn take_new_engine(&self) -> bool {
        self.new_engine.swap(false, Ordering::SeqCst)
    }

    fn set(&self) {
        let mut woken = self.woken.lock();
        *woken = true;
        self.condvar.notify_all();
    }

    /// Block until signaled. Returning resets the signal.
    pub fn wait(&self) {
        let mut woken = self.woken.lock();
        while !*woken {
            self.condvar.wait(&mut woken);
        }
        *woken = false;
    }

    /// Like `wait`, but gives up after `timeout`. Returns true if signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut woken = self.woken.lock();
        if !*woken {
            self.condvar.wait_for(&mut woken, timeout);
        }
        std::mem::replace(&mut *woken, false)
    }

    /// Block until `quiet` passes without a new signal.
    ///
    /// Returns early once exit is requested. Signals absorbed here are not
    /// lost: their paths and flags stay queued for the caller.
    pub fn settle(&self, quiet: Duration) {
        if quiet.is_zero() {
            return;
        }
        while !self.is_exit_requested() {
            if !self.wait_timeout(quiet) {
                return;
            }
        }
    }

    /// Take every pending changed path, de-duplicated, first-seen order.
    pub fn drain_changed(&self) -> Vec<PathBuf> {
        let mut seen = FxHashSet::default();
        let mut paths = Vec::new();
        while let Some(path) = self.changed.pop() {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
        paths
    }
}
