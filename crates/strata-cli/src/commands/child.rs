//! `strata child`: the worker running inside the new namespaces.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use strata_common::config::ExecutorKind;
use strata_common::constants;
use strata_common::error::StrataError;
use strata_runtime::supervisor;
use strata_runtime::worker::WorkerOptions;

/// Exit code for a malformed worker invocation.
const USAGE_EXIT: u8 = 2;

/// Worker arguments. Options come first, then exactly four positional paths:
/// `<config> <manifest> <base-dir> <volume-dir>`.
#[derive(Args, Debug, Clone)]
pub struct ChildArgs {
    /// Extracted layer cache [default: `layers` beside the base directory].
    #[arg(long = "layers")]
    pub layer_root: Option<PathBuf>,

    /// Shell started after the root switch.
    #[arg(long, default_value = constants::DEFAULT_SHELL)]
    pub shell: PathBuf,

    /// How mount operations are carried out.
    #[arg(long, default_value_t = ExecutorKind::Syscall)]
    pub executor: ExecutorKind,

    /// Lazily unmount what was mounted if setup fails before the root switch.
    #[arg(long)]
    pub unwind: bool,

    /// Positional paths; the count is validated by the worker itself.
    #[arg(value_name = "PATH")]
    pub positional: Vec<String>,
}

impl ChildArgs {
    /// Returns the non-positional worker settings.
    #[must_use]
    pub fn options(&self) -> WorkerOptions {
        WorkerOptions {
            layer_root: self.layer_root.clone(),
            shell: self.shell.clone(),
            executor: self.executor,
            unwind_on_failure: self.unwind,
        }
    }
}

/// Runs the worker and returns the shell's exit code, or a failure code if
/// setup did not reach the shell.
pub fn execute(args: ChildArgs) -> ExitCode {
    match supervisor::run_worker(&args.positional, args.options()) {
        Ok(exit) => super::exit_code(exit.code()),
        Err(e @ StrataError::Usage { .. }) => {
            tracing::error!(error = %e, "invalid worker invocation");
            ExitCode::from(USAGE_EXIT)
        }
        Err(e) => {
            tracing::error!(error = %e, "container setup failed");
            ExitCode::FAILURE
        }
    }
}
