//! Explicit state threaded through the worker setup pipeline.
//!
//! Every stage reads its inputs from, and records its effects in, a
//! [`ContainerSetupContext`] instead of mutating process-global state. The
//! applied environment is handed to the shell at the end; the process's own
//! environment is never modified.

use std::path::{Path, PathBuf};

use strata_common::config::StrataConfig;
use strata_common::constants;
use strata_common::error::{Result, StrataError};
use strata_common::types::{SetupState, SetupStep};
use strata_core::filesystem::overlayfs::OverlaySpec;
use strata_core::mount::{MountExecutor, MountOp};

/// Paths resolved once for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPaths {
    /// Image config descriptor.
    pub config_path: PathBuf,
    /// Image manifest descriptor.
    pub manifest_path: PathBuf,
    /// Directory the tmpfs and overlay metadata live in.
    pub base_dir: PathBuf,
    /// Union mount point, `<base_dir>/merged`.
    pub merged_dir: PathBuf,
    /// Host directory bound into the container.
    pub volume_dir: PathBuf,
    /// Extracted layer cache.
    pub layer_root: PathBuf,
}

impl From<&StrataConfig> for SetupPaths {
    fn from(config: &StrataConfig) -> Self {
        Self {
            config_path: config.config_path.clone(),
            manifest_path: config.manifest_path.clone(),
            base_dir: config.base_dir.clone(),
            merged_dir: constants::merged_dir(&config.base_dir),
            volume_dir: config.volume_dir.clone(),
            layer_root: config.layer_root.clone(),
        }
    }
}

/// Everything the pipeline has resolved and done so far.
#[derive(Debug, Clone)]
pub struct ContainerSetupContext {
    /// Resolved input and output paths.
    pub paths: SetupPaths,
    /// Environment applied so far, in descriptor order.
    pub environment: Vec<(String, String)>,
    /// Overlay layout once assembled.
    pub overlay: Option<OverlaySpec>,
    /// Mount points created so far, oldest first.
    pub mounts: Vec<PathBuf>,
    state: SetupState,
}

impl ContainerSetupContext {
    /// Creates an unmounted context for the given run configuration.
    #[must_use]
    pub fn new(config: &StrataConfig) -> Self {
        Self {
            paths: SetupPaths::from(config),
            environment: Vec::new(),
            overlay: None,
            mounts: Vec::new(),
            state: SetupState::Unmounted,
        }
    }

    /// Returns the current pipeline state.
    #[must_use]
    pub const fn state(&self) -> &SetupState {
        &self.state
    }

    /// Returns the value of an applied environment variable. A later entry
    /// with the same key wins.
    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Checks that the pipeline is in `expected` before running `step`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Validation`] when stages run out of order or
    /// after a failure.
    pub fn require(&self, expected: &SetupState, step: SetupStep) -> Result<()> {
        if &self.state == expected {
            return Ok(());
        }
        Err(StrataError::Validation {
            message: format!(
                "{step} requires state {expected}, but the pipeline is {}",
                self.state
            ),
        })
    }

    /// Moves the pipeline forward.
    pub fn advance(&mut self, next: SetupState) {
        tracing::debug!(from = %self.state, to = %next, "setup state transition");
        self.state = next;
    }

    /// Moves the pipeline into its terminal failed state.
    pub fn fail(&mut self, step: SetupStep, cause: &StrataError) {
        tracing::error!(%step, state = %self.state, error = %cause, "setup step failed");
        self.state = SetupState::Failed {
            step,
            cause: cause.to_string(),
        };
    }

    /// Returns an executor that records successful mounts into this context.
    pub fn tracked<'a>(&'a mut self, inner: &'a mut dyn MountExecutor) -> TrackedExecutor<'a> {
        TrackedExecutor {
            inner,
            mounts: &mut self.mounts,
        }
    }

    /// Returns `true` if `path` carries a mount made by this run.
    #[must_use]
    pub fn has_mount(&self, path: &Path) -> bool {
        self.mounts.iter().any(|m| m == path)
    }
}

/// Executor wrapper that appends every new mount point to the context.
pub struct TrackedExecutor<'a> {
    inner: &'a mut dyn MountExecutor,
    mounts: &'a mut Vec<PathBuf>,
}

impl MountExecutor for TrackedExecutor<'_> {
    fn execute(&mut self, op: &MountOp) -> Result<()> {
        self.inner.execute(op)?;
        if op.creates_mount() {
            self.mounts.push(op.target().to_path_buf());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::mount::recording::RecordingExecutor;

    #[test]
    fn new_context_resolves_merged_dir() {
        let config = StrataConfig::from_image_dir(Path::new("/img"));
        let ctx = ContainerSetupContext::new(&config);
        assert_eq!(ctx.paths.merged_dir, PathBuf::from("/img/overlay/merged"));
        assert_eq!(ctx.state(), &SetupState::Unmounted);
    }

    #[test]
    fn require_rejects_out_of_order_stage() {
        let ctx = ContainerSetupContext::new(&StrataConfig::default());
        let err = ctx
            .require(&SetupState::OverlayReady, SetupStep::BaseFilesystems)
            .expect_err("out of order");
        assert!(err.to_string().contains("overlay-ready"));
    }

    #[test]
    fn tracked_executor_records_only_mounts() {
        let mut ctx = ContainerSetupContext::new(&StrataConfig::default());
        let mut inner = RecordingExecutor::new();
        {
            let mut exec = ctx.tracked(&mut inner);
            exec.execute(&MountOp::MakeRPrivate { target: "/".into() })
                .expect("rprivate");
            exec.execute(&MountOp::filesystem("tmpfs", "tmpfs", "/b"))
                .expect("tmpfs");
        }
        assert_eq!(ctx.mounts, vec![PathBuf::from("/b")]);
        assert!(ctx.has_mount(Path::new("/b")));
    }

    #[test]
    fn env_var_prefers_latest_entry() {
        let mut ctx = ContainerSetupContext::new(&StrataConfig::default());
        ctx.environment.push(("A".into(), "1".into()));
        ctx.environment.push(("A".into(), "2".into()));
        assert_eq!(ctx.env_var("A"), Some("2"));
        assert_eq!(ctx.env_var("B"), None);
    }
}
