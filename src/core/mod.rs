//! Process-wide state and exit codes.

mod exit;
mod state;

pub use exit::ExitCode;
pub use state::{is_shutdown, register_watch, setup_shutdown_handler};
