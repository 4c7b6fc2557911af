//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// kiln: incremental content pipelines
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run every pipeline once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Run every pipeline, then re-run on input or config changes
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: RunArgs,
    },
}

/// Arguments shared by Build and Watch
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Root folder, or a config file whose folder is the root
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    pub root: Option<PathBuf>,

    /// Input folder (relative to the root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub input: Option<PathBuf>,

    /// Output folder (relative to the root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Config file (relative to the root, default: kiln.toml)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Keep the output folder contents before running
    #[arg(long)]
    pub no_clean: bool,

    /// Disable the per-module result cache
    #[arg(long)]
    pub no_cache: bool,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write every trace message to a log file
    /// (default: kiln-<timestamp>.log in the root)
    #[arg(short, long, num_args = 0..=1, value_hint = clap::ValueHint::FilePath)]
    pub log: Option<Option<PathBuf>>,
}

impl Cli {
    pub const fn args(&self) -> &RunArgs {
        match &self.command {
            Commands::Build { args } | Commands::Watch { args } => args,
        }
    }

    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }
}
