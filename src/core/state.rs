//! Shutdown state.
//!
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)
//!
//! Once a watch loop is registered, Ctrl+C wakes it with an exit request
//! so watchers are released and the loop returns normally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use super::ExitCode;
use crate::watch::WatchSignal;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Signal of the running watch loop
static WATCH: OnceLock<Arc<WatchSignal>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_watch()`: exits at once, a one-shot run is interrupted
/// - After `register_watch()`: asks the watch loop to exit
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if let Some(signal) = WATCH.get() {
            crate::log!("watch"; "shutting down...");
            signal.request_exit();
        } else {
            std::process::exit(i32::from(ExitCode::ExecutionError.code()));
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the watch loop signal for graceful shutdown
pub fn register_watch(signal: Arc<WatchSignal>) {
    let _ = WATCH.set(signal);
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
