//! Root filesystem switching via `pivot_root(2)`.
//!
//! More secure than `chroot` because it actually changes the root mount
//! point rather than just the process's view of `/`.

use std::path::{Path, PathBuf};

use strata_common::error::Result;

use crate::mount::{MountExecutor, MountOp};

/// Makes every mount below `/` private so nothing propagates to the host.
///
/// Must run in a fresh mount namespace before any other mount.
///
/// # Errors
///
/// Returns an error if the propagation change fails.
pub fn make_rprivate(executor: &mut dyn MountExecutor) -> Result<()> {
    executor.execute(&MountOp::MakeRPrivate {
        target: PathBuf::from("/"),
    })
}

/// Switches the root filesystem to `new_root` and detaches the old root.
///
/// Uses the self-referential form `pivot_root . .` from inside `new_root`:
/// the old root ends up stacked on the same mount point and is then lazily
/// unmounted, so no `put_old` directory is needed.
///
/// # Errors
///
/// Returns an error if changing directory, pivoting, or the unmount fails.
/// The process root is left as-is on failure.
pub fn pivot_root(executor: &mut dyn MountExecutor, new_root: &Path) -> Result<()> {
    tracing::info!(new_root = %new_root.display(), "performing pivot_root");
    let here = PathBuf::from(".");
    executor.execute(&MountOp::ChangeDir {
        target: new_root.to_path_buf(),
    })?;
    executor.execute(&MountOp::PivotRoot {
        new_root: here.clone(),
        put_old: here.clone(),
    })?;
    executor.execute(&MountOp::DetachUnmount { target: here })?;
    Ok(())
}
