//! The two phases of a run: the host-side supervisor and the in-namespace
//! worker.

use std::path::Path;

use strata_common::config::StrataConfig;
use strata_common::constants::SELF_EXE;
use strata_common::error::{Result, StrataError};
use strata_core::mount;
use strata_core::namespace::NamespaceSet;
use strata_core::namespace::launch::{self, ProcessExit};

use crate::pipeline::Pipeline;
use crate::worker::{self, WorkerArgs, WorkerOptions};

/// Prepares the host side and re-executes this binary as the worker inside
/// fresh namespaces, waiting for it to finish.
///
/// # Errors
///
/// Returns an error if a path cannot be passed to the worker, the volume
/// directory cannot be created, or the namespaced child cannot be launched
/// or waited for.
pub fn supervise(config: &StrataConfig, namespaces: &NamespaceSet) -> Result<ProcessExit> {
    let argv = worker::worker_argv(config)?;
    std::fs::create_dir_all(&config.volume_dir).map_err(|e| StrataError::Io {
        path: config.volume_dir.clone(),
        source: e,
    })?;

    tracing::info!(
        base_dir = %config.base_dir.display(),
        volume_dir = %config.volume_dir.display(),
        executor = %config.executor,
        "launching worker in new namespaces"
    );
    let exit = launch::spawn_in_namespaces(namespaces, Path::new(SELF_EXE), &argv)?;
    tracing::info!(code = exit.code(), "worker exited");
    Ok(exit)
}

/// Validates the worker arguments and runs the setup pipeline followed by
/// the shell.
///
/// Nothing is mounted unless the positional arguments are valid.
///
/// # Errors
///
/// Returns [`StrataError::Usage`] for a wrong argument count, an error if
/// the executor cannot be opened, or the first pipeline failure.
pub fn run_worker(positional: &[String], options: WorkerOptions) -> Result<ProcessExit> {
    let args = WorkerArgs::from_positional(positional)?;
    let executor = mount::open_executor(options.executor)?;
    let config = worker::worker_config(args, options);
    tracing::debug!(?config, "worker configuration");
    Pipeline::new(config, executor).run()
}
