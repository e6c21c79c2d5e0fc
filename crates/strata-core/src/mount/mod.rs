//! The narrow capability through which every mount-table change flows.
//!
//! Setup stages describe what they want as a [`MountOp`] and hand it to a
//! [`MountExecutor`]. Three executors exist:
//! - [`syscall::SyscallExecutor`] issues `mount(2)`, `umount2(2)`,
//!   `pivot_root(2)` and `chdir(2)` directly.
//! - [`command::CommandExecutor`] runs the host `mount`/`umount` tools and
//!   keeps their combined output on failure.
//! - [`recording::RecordingExecutor`] performs nothing and records the
//!   sequence, for harnesses without `CAP_SYS_ADMIN`.

pub mod command;
pub mod recording;
pub mod syscall;

use std::fmt;
use std::path::{Path, PathBuf};

use strata_common::config::ExecutorKind;
use strata_common::error::Result;

/// One operation on the mount table or the process root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOp {
    /// `mount --make-rprivate <target>`.
    MakeRPrivate {
        /// Mount whose subtree stops propagating.
        target: PathBuf,
    },
    /// `mount -t <fstype> <source> [-o <options>] <target>`.
    Filesystem {
        /// Filesystem type, e.g. `overlay` or `tmpfs`.
        fstype: String,
        /// Mount source; pseudo-filesystems use a conventional name.
        source: String,
        /// Mount point.
        target: PathBuf,
        /// Filesystem-specific data string.
        options: Option<String>,
    },
    /// `mount --bind <source> <target>`.
    Bind {
        /// Host directory.
        source: PathBuf,
        /// Mount point.
        target: PathBuf,
    },
    /// `pivot_root <new_root> <put_old>`.
    PivotRoot {
        /// Directory that becomes `/`.
        new_root: PathBuf,
        /// Where the old root is stacked.
        put_old: PathBuf,
    },
    /// `umount -l <target>`.
    DetachUnmount {
        /// Mount point to lazily detach.
        target: PathBuf,
    },
    /// `cd <target>`.
    ChangeDir {
        /// New working directory.
        target: PathBuf,
    },
}

impl MountOp {
    /// Builds a filesystem mount without options.
    pub fn filesystem(fstype: &str, source: &str, target: impl Into<PathBuf>) -> Self {
        Self::Filesystem {
            fstype: fstype.to_owned(),
            source: source.to_owned(),
            target: target.into(),
            options: None,
        }
    }

    /// Returns the path this operation acts on.
    #[must_use]
    pub fn target(&self) -> &Path {
        match self {
            Self::MakeRPrivate { target }
            | Self::Filesystem { target, .. }
            | Self::Bind { target, .. }
            | Self::DetachUnmount { target }
            | Self::ChangeDir { target } => target,
            Self::PivotRoot { new_root, .. } => new_root,
        }
    }

    /// Returns `true` if a successful run leaves a new mount at [`Self::target`].
    #[must_use]
    pub const fn creates_mount(&self) -> bool {
        matches!(self, Self::Filesystem { .. } | Self::Bind { .. })
    }

    /// Returns the host tool and its arguments equivalent to this operation.
    #[must_use]
    pub fn command_line(&self) -> (&'static str, Vec<String>) {
        let show = |p: &Path| p.display().to_string();
        match self {
            Self::MakeRPrivate { target } => {
                ("mount", vec!["--make-rprivate".into(), show(target)])
            }
            Self::Filesystem {
                fstype,
                source,
                target,
                options,
            } => {
                let mut args = vec!["-t".into(), fstype.clone(), source.clone()];
                if let Some(options) = options {
                    args.push("-o".into());
                    args.push(options.clone());
                }
                args.push(show(target));
                ("mount", args)
            }
            Self::Bind { source, target } => {
                ("mount", vec!["--bind".into(), show(source), show(target)])
            }
            Self::PivotRoot { new_root, put_old } => {
                ("pivot_root", vec![show(new_root), show(put_old)])
            }
            Self::DetachUnmount { target } => ("umount", vec!["-l".into(), show(target)]),
            Self::ChangeDir { target } => ("cd", vec![show(target)]),
        }
    }
}

impl fmt::Display for MountOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (program, args) = self.command_line();
        write!(f, "{program}")?;
        for arg in args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Carries out [`MountOp`]s.
pub trait MountExecutor {
    /// Performs one operation, or fails without retrying.
    ///
    /// # Errors
    ///
    /// Returns a mount error describing the failed operation.
    fn execute(&mut self, op: &MountOp) -> Result<()>;
}

impl<E: MountExecutor + ?Sized> MountExecutor for &mut E {
    fn execute(&mut self, op: &MountOp) -> Result<()> {
        (**self).execute(op)
    }
}

impl<E: MountExecutor + ?Sized> MountExecutor for Box<E> {
    fn execute(&mut self, op: &MountOp) -> Result<()> {
        (**self).execute(op)
    }
}

/// Creates the executor selected by configuration.
///
/// # Errors
///
/// Returns an error if the command executor cannot locate the host tools.
pub fn open_executor(kind: ExecutorKind) -> Result<Box<dyn MountExecutor>> {
    tracing::debug!(executor = %kind, "opening mount executor");
    Ok(match kind {
        ExecutorKind::Syscall => Box::new(syscall::SyscallExecutor),
        ExecutorKind::Command => Box::new(command::CommandExecutor::locate()?),
    })
}
