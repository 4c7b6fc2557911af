//! Command-line interface module.

mod args;
pub mod build;
mod common;
pub mod watch;

pub use args::{Cli, Commands, RunArgs};
