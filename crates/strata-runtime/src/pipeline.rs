//! The worker-side setup pipeline.
//!
//! Runs once inside the new namespaces, strictly in order:
//!
//! ```text
//! rprivate / ─▶ environment ─▶ tmpfs ─▶ overlay ─▶ proc,sys,dev,… ─▶ volume ─▶ pivot_root ─▶ shell
//!   Unmounted     Unmounted   TmpfsReady OverlayReady  BaseFsReady   VolumeReady RootSwitched ShellRunning
//! ```
//!
//! The first failure moves the context to `Failed` and is returned wrapped
//! with its step. Nothing later runs and, unless unwinding is enabled, no
//! mount is undone; the kernel discards them with the mount namespace.

use strata_common::config::StrataConfig;
use strata_common::error::{Result, StrataError};
use strata_common::types::{SetupState, SetupStep};
use strata_core::filesystem::{mount, overlayfs, pivot_root};
use strata_core::mount::{MountExecutor, MountOp};
use strata_core::namespace::launch::ProcessExit;
use strata_image::descriptor;
use strata_image::storage::LayerStore;

use crate::context::ContainerSetupContext;
use crate::environment;

/// Sequences every setup stage over a mount executor.
pub struct Pipeline<E> {
    config: StrataConfig,
    executor: E,
}

impl<E: MountExecutor> Pipeline<E> {
    /// Creates a pipeline for one run.
    pub const fn new(config: StrataConfig, executor: E) -> Self {
        Self { config, executor }
    }

    /// Returns the executor, e.g. to inspect a recording one.
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Returns the run configuration.
    pub const fn config(&self) -> &StrataConfig {
        &self.config
    }

    /// Creates a fresh context for this pipeline's configuration.
    #[must_use]
    pub fn context(&self) -> ContainerSetupContext {
        ContainerSetupContext::new(&self.config)
    }

    /// Runs every stage up to and including the root switch, then the shell.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure, wrapped with its step.
    pub fn run(&mut self) -> Result<ProcessExit> {
        let mut ctx = self.context();
        self.prepare(&mut ctx)?;
        ctx.advance(SetupState::ShellRunning);
        crate::shell::run_shell(&self.config.shell, &ctx.environment)
            .map_err(|e| self.failed(&mut ctx, SetupStep::Shell, e))
    }

    /// Runs every stage up to and including the root switch.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure, wrapped with its step.
    pub fn prepare(&mut self, ctx: &mut ContainerSetupContext) -> Result<()> {
        self.make_private(ctx)?;
        self.apply_environment(ctx)?;
        self.assemble_overlay(ctx)?;
        self.mount_base_filesystems(ctx)?;
        self.bind_volume(ctx)?;
        self.switch_root(ctx)
    }

    /// Detaches `/` from the host's propagation group.
    ///
    /// # Errors
    ///
    /// Returns the wrapped mount error.
    pub fn make_private(&mut self, ctx: &mut ContainerSetupContext) -> Result<()> {
        let step = SetupStep::Propagation;
        ctx.require(&SetupState::Unmounted, step)
            .and_then(|()| pivot_root::make_rprivate(&mut self.executor))
            .map_err(|e| self.failed(ctx, step, e))
    }

    /// Loads the image environment and applies it to the context.
    ///
    /// # Errors
    ///
    /// Returns the wrapped load or validation error.
    pub fn apply_environment(&mut self, ctx: &mut ContainerSetupContext) -> Result<()> {
        let step = SetupStep::Environment;
        let outcome = ctx.require(&SetupState::Unmounted, step).and_then(|()| {
            let entries = descriptor::load_environment(&ctx.paths.config_path)?;
            environment::apply_environment(ctx, &entries)
        });
        outcome.map_err(|e| self.failed(ctx, step, e))
    }

    /// Loads the manifest and mounts the tmpfs-backed overlay.
    ///
    /// # Errors
    ///
    /// Fails if the context has already assembled an overlay, if the base
    /// directory is already mounted, or on any load/mkdir/mount error.
    pub fn assemble_overlay(&mut self, ctx: &mut ContainerSetupContext) -> Result<()> {
        let step = SetupStep::Overlay;
        let outcome = self.try_assemble_overlay(ctx);
        outcome.map_err(|e| self.failed(ctx, step, e))
    }

    fn try_assemble_overlay(&mut self, ctx: &mut ContainerSetupContext) -> Result<()> {
        ctx.require(&SetupState::Unmounted, SetupStep::Overlay)?;
        let paths = ctx.paths.clone();

        let layers = descriptor::load_manifest(&paths.manifest_path)?;
        let store = LayerStore::open(&paths.layer_root);
        let spec = overlayfs::OverlaySpec::from_manifest(&paths.base_dir, &layers, &store)?;

        overlayfs::mount_base_tmpfs(&mut ctx.tracked(&mut self.executor), &paths.base_dir)?;
        ctx.advance(SetupState::TmpfsReady);

        overlayfs::mount_overlay(&mut ctx.tracked(&mut self.executor), &spec)?;
        ctx.overlay = Some(spec);
        ctx.advance(SetupState::OverlayReady);
        Ok(())
    }

    /// Mounts the pseudo-filesystems into the merged tree.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error of the first failing mount.
    pub fn mount_base_filesystems(&mut self, ctx: &mut ContainerSetupContext) -> Result<()> {
        let step = SetupStep::BaseFilesystems;
        let merged = ctx.paths.merged_dir.clone();
        let outcome = ctx.require(&SetupState::OverlayReady, step).and_then(|()| {
            mount::mount_essential_filesystems(&mut ctx.tracked(&mut self.executor), &merged)
        });
        match outcome {
            Ok(()) => {
                ctx.advance(SetupState::BaseFsReady);
                Ok(())
            }
            Err(e) => Err(self.failed(ctx, step, e)),
        }
    }

    /// Binds the host volume at `<merged>/volume`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped not-found, mkdir, or mount error.
    pub fn bind_volume(&mut self, ctx: &mut ContainerSetupContext) -> Result<()> {
        let step = SetupStep::Volume;
        let paths = ctx.paths.clone();
        let outcome = ctx.require(&SetupState::BaseFsReady, step).and_then(|()| {
            mount::bind_volume(
                &mut ctx.tracked(&mut self.executor),
                &paths.volume_dir,
                &paths.merged_dir,
            )
        });
        match outcome {
            Ok(target) => {
                tracing::info!(target = %target.display(), "volume bound");
                ctx.advance(SetupState::VolumeReady);
                Ok(())
            }
            Err(e) => Err(self.failed(ctx, step, e)),
        }
    }

    /// Pivots into the merged tree and detaches the old root.
    ///
    /// # Errors
    ///
    /// Returns the wrapped chdir, pivot, or unmount error.
    pub fn switch_root(&mut self, ctx: &mut ContainerSetupContext) -> Result<()> {
        let step = SetupStep::RootSwitch;
        let merged = ctx.paths.merged_dir.clone();
        let outcome = ctx
            .require(&SetupState::VolumeReady, step)
            .and_then(|()| pivot_root::pivot_root(&mut self.executor, &merged));
        match outcome {
            Ok(()) => {
                // Every earlier mount now lives under the new root or went
                // away with the old one.
                ctx.mounts.clear();
                ctx.advance(SetupState::RootSwitched);
                Ok(())
            }
            Err(e) => Err(self.failed(ctx, step, e)),
        }
    }

    fn failed(
        &mut self,
        ctx: &mut ContainerSetupContext,
        step: SetupStep,
        err: StrataError,
    ) -> StrataError {
        ctx.fail(step, &err);
        if self.config.unwind_on_failure {
            self.unwind(ctx);
        }
        err.in_step(step)
    }

    /// Lazily unmounts this run's mounts, newest first. Failures are logged
    /// and skipped.
    fn unwind(&mut self, ctx: &mut ContainerSetupContext) {
        while let Some(target) = ctx.mounts.pop() {
            let op = MountOp::DetachUnmount { target };
            if let Err(e) = self.executor.execute(&op) {
                tracing::warn!(command = %op, error = %e, "unwind unmount failed");
            }
        }
    }
}
