//! kiln: incremental content pipelines with per-module result caching.

#![allow(dead_code)]

mod cache;
mod cli;
mod config;
mod core;
mod document;
mod engine;
mod logger;
mod module;
mod pipeline;
mod utils;
mod watch;

use std::panic::{self, AssertUnwindSafe};

use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use crate::core::ExitCode;

fn main() -> std::process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() {
                ExitCode::CommandLineError
            } else {
                ExitCode::Normal
            };
            return code.into();
        }
    };

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    // Setup global Ctrl+C handler (before any blocking operations)
    if let Err(err) = core::setup_shutdown_handler() {
        critical!("error"; "{:#}", err);
        return ExitCode::UnhandledError.into();
    }

    let code = panic::catch_unwind(AssertUnwindSafe(|| run(&cli))).unwrap_or_else(|_| {
        critical!("error"; "unexpected internal error");
        ExitCode::UnhandledError
    });
    code.into()
}

fn run(cli: &Cli) -> ExitCode {
    match &cli.command {
        Commands::Build { args } => cli::build::build(args),
        Commands::Watch { args } => cli::watch::watch(args),
    }
}
