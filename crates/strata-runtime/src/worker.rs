//! The worker entry contract.
//!
//! The supervisor re-executes the binary as
//! `child [options] <config> <manifest> <base-dir> <volume-dir>`. The four
//! positional paths are checked here rather than indexed blindly, so a
//! harness can drive the worker without going through a real process.

use std::path::{Path, PathBuf};

use strata_common::config::{ExecutorKind, StrataConfig};
use strata_common::constants::{self, CHILD_SENTINEL, WORKER_ARG_COUNT};
use strata_common::error::{Result, StrataError};

/// Flag carrying the layer cache root to the worker.
pub const LAYERS_FLAG: &str = "--layers";
/// Flag carrying the shell path to the worker.
pub const SHELL_FLAG: &str = "--shell";
/// Flag carrying the executor kind to the worker.
pub const EXECUTOR_FLAG: &str = "--executor";
/// Flag enabling best-effort unmount on failure.
pub const UNWIND_FLAG: &str = "--unwind";
/// Separates worker options from the positional paths.
pub const POSITIONAL_SEPARATOR: &str = "--";

/// The four positional paths the worker is started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerArgs {
    /// Image config descriptor.
    pub config_path: PathBuf,
    /// Image manifest descriptor.
    pub manifest_path: PathBuf,
    /// Overlay base directory.
    pub base_dir: PathBuf,
    /// Host volume directory.
    pub volume_dir: PathBuf,
}

impl WorkerArgs {
    /// Validates the positional arguments following the sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Usage`] unless exactly four arguments are given.
    pub fn from_positional(args: &[String]) -> Result<Self> {
        match args {
            [config, manifest, base, volume] => Ok(Self {
                config_path: PathBuf::from(config),
                manifest_path: PathBuf::from(manifest),
                base_dir: PathBuf::from(base),
                volume_dir: PathBuf::from(volume),
            }),
            _ => Err(StrataError::Usage {
                message: format!(
                    "`{CHILD_SENTINEL}` takes exactly {WORKER_ARG_COUNT} arguments \
                     (<config> <manifest> <base-dir> <volume-dir>), got {}",
                    args.len()
                ),
            }),
        }
    }

    /// Returns the positional arguments in contract order.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Validation`] if a path is not valid UTF-8.
    pub fn to_positional(&self) -> Result<Vec<String>> {
        [
            &self.config_path,
            &self.manifest_path,
            &self.base_dir,
            &self.volume_dir,
        ]
        .into_iter()
        .map(|p| path_arg(p))
        .collect()
    }
}

impl From<&StrataConfig> for WorkerArgs {
    fn from(config: &StrataConfig) -> Self {
        Self {
            config_path: config.config_path.clone(),
            manifest_path: config.manifest_path.clone(),
            base_dir: config.base_dir.clone(),
            volume_dir: config.volume_dir.clone(),
        }
    }
}

/// Worker settings passed as options rather than positionals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Extracted layer cache. Defaults to `layers` next to the base directory.
    pub layer_root: Option<PathBuf>,
    /// Shell to start after the root switch.
    pub shell: PathBuf,
    /// Mount executor to use.
    pub executor: ExecutorKind,
    /// Best-effort unmount on failure.
    pub unwind_on_failure: bool,
}

impl From<&StrataConfig> for WorkerOptions {
    fn from(config: &StrataConfig) -> Self {
        Self {
            layer_root: Some(config.layer_root.clone()),
            shell: config.shell.clone(),
            executor: config.executor,
            unwind_on_failure: config.unwind_on_failure,
        }
    }
}

/// Returns the layer cache of the image directory that holds `base_dir`,
/// mirroring the layout of [`StrataConfig::from_image_dir`].
#[must_use]
pub fn default_layer_root(base_dir: &Path) -> PathBuf {
    base_dir
        .parent()
        .map_or_else(constants::default_image_dir, Path::to_path_buf)
        .join(constants::LAYERS_DIR)
}

/// Combines the worker contract back into a run configuration.
#[must_use]
pub fn worker_config(args: WorkerArgs, options: WorkerOptions) -> StrataConfig {
    let layer_root = options
        .layer_root
        .unwrap_or_else(|| default_layer_root(&args.base_dir));
    StrataConfig {
        config_path: args.config_path,
        manifest_path: args.manifest_path,
        base_dir: args.base_dir,
        volume_dir: args.volume_dir,
        layer_root,
        shell: options.shell,
        executor: options.executor,
        unwind_on_failure: options.unwind_on_failure,
    }
}

fn path_arg(path: &Path) -> Result<String> {
    path.to_str().map(str::to_owned).ok_or_else(|| StrataError::Validation {
        message: format!("path `{}` is not valid UTF-8", path.display()),
    })
}

/// Builds the argument list (without `argv[0]`) for re-executing as worker.
///
/// The positional paths follow a `--` separator so that a path beginning
/// with `-` is never read as an option.
///
/// # Errors
///
/// Returns [`StrataError::Validation`] if any path is not valid UTF-8.
pub fn worker_argv(config: &StrataConfig) -> Result<Vec<String>> {
    let mut argv = vec![
        CHILD_SENTINEL.to_owned(),
        LAYERS_FLAG.to_owned(),
        path_arg(&config.layer_root)?,
        SHELL_FLAG.to_owned(),
        path_arg(&config.shell)?,
        EXECUTOR_FLAG.to_owned(),
        config.executor.to_string(),
    ];
    if config.unwind_on_failure {
        argv.push(UNWIND_FLAG.to_owned());
    }
    argv.push(POSITIONAL_SEPARATOR.to_owned());
    argv.extend(WorkerArgs::from(config).to_positional()?);
    Ok(argv)
}
