//! Executor that shells out to the host's util-linux tools.
//!
//! Produces exactly the command lines an operator would type, which keeps the
//! mount table identical to a manual setup on hosts where the `mount` helper
//! adds behaviour (e.g. `/etc/fstab` lookups or helper programs).

use std::path::{Path, PathBuf};
use std::process::Command;

use strata_common::error::{Result, StrataError};

use super::syscall::SyscallExecutor;
use super::{MountExecutor, MountOp};

/// Runs `mount` and `umount`; pivoting and `chdir` stay system calls since
/// they must act on this very process.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    mount_bin: PathBuf,
    umount_bin: PathBuf,
}

impl CommandExecutor {
    /// Uses explicit tool paths.
    pub fn new(mount_bin: impl Into<PathBuf>, umount_bin: impl Into<PathBuf>) -> Self {
        Self {
            mount_bin: mount_bin.into(),
            umount_bin: umount_bin.into(),
        }
    }

    /// Finds `mount` and `umount` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::NotFound`] if either tool is missing.
    pub fn locate() -> Result<Self> {
        let find = |name: &str| {
            which::which(name).map_err(|e| StrataError::NotFound {
                kind: "binary",
                id: format!("{name} ({e})"),
            })
        };
        Ok(Self::new(find("mount")?, find("umount")?))
    }

    fn run(program: &Path, op: &MountOp) -> Result<()> {
        let (_, args) = op.command_line();
        let output = Command::new(program)
            .args(&args)
            .output()
            .map_err(|e| StrataError::Io {
                path: program.to_path_buf(),
                source: e,
            })?;
        if output.status.success() {
            return Ok(());
        }
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(StrataError::Mount {
            command: op.to_string(),
            output: format!("{} ({})", combined.trim(), output.status),
        })
    }
}

impl MountExecutor for CommandExecutor {
    fn execute(&mut self, op: &MountOp) -> Result<()> {
        match op {
            MountOp::PivotRoot { .. } | MountOp::ChangeDir { .. } => {
                SyscallExecutor.execute(op)
            }
            MountOp::DetachUnmount { .. } => {
                tracing::info!(command = %op, "mount operation");
                Self::run(&self.umount_bin, op)
            }
            MountOp::MakeRPrivate { .. } | MountOp::Filesystem { .. } | MountOp::Bind { .. } => {
                tracing::info!(command = %op, "mount operation");
                Self::run(&self.mount_bin, op)
            }
        }
    }
}
