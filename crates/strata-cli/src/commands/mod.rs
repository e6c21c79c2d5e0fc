//! CLI definition and dispatch.
//!
//! Without a subcommand the binary acts as the supervisor. The hidden
//! `child` subcommand is the worker entry point the supervisor re-executes
//! inside the new namespaces.

pub mod child;
pub mod run;

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use strata_common::constants;

/// Strata: an interactive shell in an isolated, layered container root.
#[derive(Parser, Debug)]
#[command(
    name = "strata",
    version,
    about,
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Worker entry point; not for direct use.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Supervisor options.
    #[command(flatten)]
    pub run: run::RunArgs,

    /// Log output format.
    #[arg(long, global = true, env = "STRATA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set up the container root and run the shell (invoked by the supervisor).
    #[command(name = constants::CHILD_SENTINEL, hide = true)]
    Child(child::ChildArgs),
}

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Dispatches the parsed command line and returns the process exit code.
///
/// # Errors
///
/// Returns an error if the supervisor cannot launch the worker.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Some(Command::Child(args)) => Ok(child::execute(args)),
        None => run::execute(&cli.run),
    }
}

/// Converts a child exit code to this process's exit code.
pub(crate) fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
