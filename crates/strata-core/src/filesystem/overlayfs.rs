//! `OverlayFS` management for layered container filesystems.
//!
//! Stacks the image's read-only layers under a single writable upper layer.
//! The upper and work directories live on a tmpfs mounted over the base
//! directory, so nothing written inside the container survives the run.

use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use strata_common::constants;
use strata_common::error::{Result, StrataError};
use strata_image::layer::LayerDescriptor;
use strata_image::storage::LayerStore;

use crate::mount::{MountExecutor, MountOp};

/// Directory layout of an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    /// Read-only lower layers, highest priority (topmost image layer) first.
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlaySpec {
    /// Builds the layout for an image manifest under `base_dir`.
    ///
    /// Manifest layers are listed base-first while overlay treats the first
    /// `lowerdir` entry as the top, so the list is reversed.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty manifest or a malformed
    /// digest, and [`StrataError::NotFound`] for a layer that has not been
    /// extracted.
    pub fn from_manifest(
        base_dir: &Path,
        layers: &[LayerDescriptor],
        store: &LayerStore,
    ) -> Result<Self> {
        if layers.is_empty() {
            return Err(StrataError::Validation {
                message: "image manifest lists no layers".into(),
            });
        }
        let lower_dirs = layers
            .iter()
            .rev()
            .map(|layer| store.resolve(layer))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            lower_dirs,
            upper_dir: base_dir.join(constants::UPPER_DIR),
            work_dir: base_dir.join(constants::WORK_DIR),
            merged_dir: constants::merged_dir(base_dir),
        })
    }

    /// Returns the overlay data string: `lowerdir=…,upperdir=…,workdir=…`.
    #[must_use]
    pub fn mount_options(&self) -> String {
        let lowers = self
            .lower_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        format!(
            "lowerdir={},upperdir={},workdir={}",
            lowers,
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }

    /// Returns the mount operation for this layout.
    #[must_use]
    pub fn mount_op(&self) -> MountOp {
        MountOp::Filesystem {
            fstype: "overlay".into(),
            source: "overlay".into(),
            target: self.merged_dir.clone(),
            options: Some(self.mount_options()),
        }
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| StrataError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Returns `true` if `path` is the root of a mount, i.e. it lives on a
/// different device than its parent.
///
/// # Errors
///
/// Returns an error if either directory cannot be inspected.
pub fn is_mount_point(path: &Path) -> Result<bool> {
    let stat = |p: &Path| {
        std::fs::metadata(p).map_err(|e| StrataError::Io {
            path: p.to_path_buf(),
            source: e,
        })
    };
    let own = stat(path)?;
    let parent = stat(&path.join(".."))?;
    Ok(own.dev() != parent.dev() || own.ino() == parent.ino())
}

/// Creates `base_dir` and mounts a fresh tmpfs over it.
///
/// # Errors
///
/// Returns [`StrataError::Validation`] if something is already mounted on
/// `base_dir`; a second assembly would shadow the first one. Otherwise
/// returns directory creation or mount errors.
pub fn mount_base_tmpfs(executor: &mut dyn MountExecutor, base_dir: &Path) -> Result<()> {
    create_dir(base_dir)?;
    if is_mount_point(base_dir)? {
        return Err(StrataError::Validation {
            message: format!(
                "{} is already a mount point; overlay assembly is not repeatable",
                base_dir.display()
            ),
        });
    }
    executor.execute(&MountOp::filesystem("tmpfs", "tmpfs", base_dir))?;
    tracing::info!(base = %base_dir.display(), "overlay base tmpfs mounted");
    Ok(())
}

/// Mounts an `OverlayFS` with the given layout.
///
/// Creates the upper, work, and merged directories, then issues a single
/// overlay mount onto the merged directory.
///
/// # Errors
///
/// Returns an error if directory creation or the mount fails.
pub fn mount_overlay(executor: &mut dyn MountExecutor, spec: &OverlaySpec) -> Result<()> {
    create_dir(&spec.upper_dir)?;
    create_dir(&spec.work_dir)?;
    create_dir(&spec.merged_dir)?;

    executor.execute(&spec.mount_op())?;
    tracing::info!(
        merged = %spec.merged_dir.display(),
        layers = spec.lower_dirs.len(),
        "overlayfs mounted"
    );
    Ok(())
}
