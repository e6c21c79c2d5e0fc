//! Handing control to the interactive shell.

use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus};

use strata_common::error::{Result, StrataError};
use strata_core::namespace::launch::ProcessExit;

/// Converts a finished child's status into a [`ProcessExit`].
#[must_use]
pub fn process_exit(status: ExitStatus) -> ProcessExit {
    match (status.code(), status.signal()) {
        (Some(code), _) => ProcessExit::Exited(code),
        (None, Some(signal)) => ProcessExit::Signaled(signal),
        (None, None) => ProcessExit::Exited(-1),
    }
}

/// Runs `shell` with inherited standard streams and `environment` layered
/// over the inherited environment, and waits for it.
///
/// # Errors
///
/// Returns [`StrataError::Io`] if the shell cannot be started.
pub fn run_shell(shell: &Path, environment: &[(String, String)]) -> Result<ProcessExit> {
    tracing::info!(shell = %shell.display(), "starting interactive shell");
    let status = Command::new(shell)
        .envs(environment.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .status()
        .map_err(|e| StrataError::Io {
            path: shell.to_path_buf(),
            source: e,
        })?;
    let exit = process_exit(status);
    tracing::info!(code = exit.code(), "shell exited");
    Ok(exit)
}
