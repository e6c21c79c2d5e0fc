//! Executor backed by direct system calls.

use strata_common::error::{Result, StrataError};

use super::{MountExecutor, MountOp};

/// Issues `mount(2)`, `umount2(2)`, `pivot_root(2)` and `chdir(2)` directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallExecutor;

impl MountExecutor for SyscallExecutor {
    #[cfg(target_os = "linux")]
    fn execute(&mut self, op: &MountOp) -> Result<()> {
        use nix::mount::{MntFlags, MsFlags, mount, umount2};
        use nix::unistd::{chdir, pivot_root};

        tracing::info!(command = %op, "mount operation");
        let outcome = match op {
            MountOp::MakeRPrivate { target } => mount(
                None::<&str>,
                target.as_path(),
                None::<&str>,
                MsFlags::MS_REC | MsFlags::MS_PRIVATE,
                None::<&str>,
            ),
            MountOp::Filesystem {
                fstype,
                source,
                target,
                options,
            } => mount(
                Some(source.as_str()),
                target.as_path(),
                Some(fstype.as_str()),
                MsFlags::empty(),
                options.as_deref(),
            ),
            MountOp::Bind { source, target } => mount(
                Some(source.as_path()),
                target.as_path(),
                None::<&str>,
                MsFlags::MS_BIND,
                None::<&str>,
            ),
            MountOp::PivotRoot { new_root, put_old } => {
                pivot_root(new_root.as_path(), put_old.as_path())
            }
            MountOp::DetachUnmount { target } => umount2(target.as_path(), MntFlags::MNT_DETACH),
            MountOp::ChangeDir { target } => chdir(target.as_path()),
        };
        outcome.map_err(|errno| StrataError::Mount {
            command: op.to_string(),
            output: errno.to_string(),
        })
    }

    /// Stub for non-Linux platforms.
    #[cfg(not(target_os = "linux"))]
    fn execute(&mut self, _op: &MountOp) -> Result<()> {
        Err(StrataError::Config {
            message: "Linux required for native container operations".into(),
        })
    }
}
