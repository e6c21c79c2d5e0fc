//! Mount utilities for container filesystem setup.
//!
//! Handles mounting `/proc`, `/sys`, `/dev` and the tmpfs scratch areas, plus
//! the host volume bind mount, inside the merged root.

use std::path::{Path, PathBuf};

use strata_common::constants;
use strata_common::error::{Result, StrataError};

use crate::mount::{MountExecutor, MountOp};

/// A pseudo-filesystem mounted under the merged root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoFilesystem {
    /// Mount point relative to the merged root.
    pub target: &'static str,
    /// Filesystem type.
    pub fstype: &'static str,
    /// Conventional mount source name.
    pub source: &'static str,
    /// Whether a missing mount point may be created. Never set for paths
    /// under `dev`, which is the host's shared devtmpfs.
    pub create_target: bool,
}

/// Filesystems a shell session expects, in mount order. `dev` precedes the
/// two mounts nested under it.
pub const BASE_FILESYSTEMS: [PseudoFilesystem; 7] = [
    PseudoFilesystem { target: "proc", fstype: "proc", source: "none", create_target: true },
    PseudoFilesystem { target: "sys", fstype: "sysfs", source: "none", create_target: true },
    PseudoFilesystem { target: "dev", fstype: "devtmpfs", source: "devtmpfs", create_target: true },
    PseudoFilesystem { target: "dev/pts", fstype: "devpts", source: "devpts", create_target: false },
    PseudoFilesystem { target: "dev/shm", fstype: "tmpfs", source: "shm", create_target: false },
    PseudoFilesystem { target: "run", fstype: "tmpfs", source: "tmpfs", create_target: true },
    PseudoFilesystem { target: "tmp", fstype: "tmpfs", source: "tmpfs", create_target: true },
];

/// Mounts essential pseudo-filesystems inside the merged root.
///
/// Stops at the first failure; mounts already made stay in place.
///
/// # Errors
///
/// Returns an error naming the target if a mount point cannot be created or
/// a mount fails.
pub fn mount_essential_filesystems(executor: &mut dyn MountExecutor, rootfs: &Path) -> Result<()> {
    tracing::debug!(rootfs = %rootfs.display(), "mounting essential filesystems");
    for fs in &BASE_FILESYSTEMS {
        let target = rootfs.join(fs.target);
        if fs.create_target && !target.exists() {
            std::fs::create_dir_all(&target).map_err(|e| StrataError::Io {
                path: target.clone(),
                source: e,
            })?;
        }
        executor.execute(&MountOp::filesystem(fs.fstype, fs.source, &target))?;
    }
    Ok(())
}

/// Bind-mounts the host volume directory at `<rootfs>/volume`.
///
/// The host directory is checked before anything is created.
///
/// # Errors
///
/// Returns [`StrataError::NotFound`] if the host directory is missing, or
/// the mkdir/mount error otherwise.
pub fn bind_volume(executor: &mut dyn MountExecutor, source: &Path, rootfs: &Path) -> Result<PathBuf> {
    if !source.is_dir() {
        return Err(StrataError::NotFound {
            kind: "volume directory",
            id: source.display().to_string(),
        });
    }
    let target = rootfs.join(constants::VOLUME_MOUNT_POINT);
    std::fs::create_dir_all(&target).map_err(|e| StrataError::Io {
        path: target.clone(),
        source: e,
    })?;

    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        "creating bind mount"
    );
    executor.execute(&MountOp::Bind {
        source: source.to_path_buf(),
        target: target.clone(),
    })?;
    Ok(target)
}
