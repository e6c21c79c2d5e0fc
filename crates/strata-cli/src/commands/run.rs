//! `strata`: supervise one container run.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use strata_common::config::{ExecutorKind, StrataConfig};
use strata_common::constants;
use strata_core::namespace::NamespaceSet;
use strata_runtime::supervisor;

/// Supervisor options. Paths not given explicitly are derived from
/// `--image-dir`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Directory holding `config.json`, `manifest.json`, `overlay`, `volume` and `layers`.
    #[arg(long, env = "STRATA_IMAGE_DIR", default_value = constants::DEFAULT_IMAGE_DIR)]
    pub image_dir: PathBuf,

    /// Image config descriptor.
    #[arg(long = "config", env = "STRATA_CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Image manifest descriptor.
    #[arg(long = "manifest", env = "STRATA_MANIFEST")]
    pub manifest_path: Option<PathBuf>,

    /// Overlay base directory; a tmpfs is mounted over it.
    #[arg(long, env = "STRATA_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Host directory bound at `/volume` inside the container.
    #[arg(long, env = "STRATA_VOLUME_DIR")]
    pub volume_dir: Option<PathBuf>,

    /// Extracted layer cache.
    #[arg(long = "layers", env = "STRATA_LAYERS")]
    pub layer_root: Option<PathBuf>,

    /// Shell started inside the container.
    #[arg(long, env = "STRATA_SHELL", default_value = constants::DEFAULT_SHELL)]
    pub shell: PathBuf,

    /// How mount operations are carried out.
    #[arg(long, env = "STRATA_EXECUTOR", default_value_t = ExecutorKind::Syscall)]
    pub executor: ExecutorKind,

    /// Lazily unmount what was mounted if setup fails before the root switch.
    #[arg(long, env = "STRATA_UNWIND")]
    pub unwind: bool,
}

impl RunArgs {
    /// Resolves the run configuration.
    #[must_use]
    pub fn to_config(&self) -> StrataConfig {
        let mut config = StrataConfig::from_image_dir(&self.image_dir);
        let overrides = [
            (&mut config.config_path, &self.config_path),
            (&mut config.manifest_path, &self.manifest_path),
            (&mut config.base_dir, &self.base_dir),
            (&mut config.volume_dir, &self.volume_dir),
            (&mut config.layer_root, &self.layer_root),
        ];
        for (slot, value) in overrides {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }
        config.shell.clone_from(&self.shell);
        config.executor = self.executor;
        config.unwind_on_failure = self.unwind;
        config
    }
}

/// Launches the worker in new namespaces and returns its exit code.
///
/// # Errors
///
/// Returns an error if the volume directory cannot be created or the worker
/// cannot be launched.
pub fn execute(args: &RunArgs) -> anyhow::Result<ExitCode> {
    let config = args.to_config();
    tracing::debug!(?config, "resolved configuration");

    let exit = supervisor::supervise(&config, &NamespaceSet::default())
        .context("failed to launch the container worker")?;
    Ok(super::exit_code(exit.code()))
}
