//! Executor that records operations instead of performing them.

use std::collections::HashSet;
use std::path::PathBuf;

use strata_common::error::{Result, StrataError};

use super::{MountExecutor, MountOp};

/// Records every attempted [`MountOp`] without touching the kernel.
///
/// Mounting a filesystem onto a target that is still mounted fails the way a
/// busy mount point would, so repeated setup against one directory surfaces
/// as an error rather than silently stacking. Failures can be injected by
/// operation index or target path.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    ops: Vec<MountOp>,
    mounted: HashSet<PathBuf>,
    fail_at: Option<usize>,
    fail_target: Option<PathBuf>,
}

impl RecordingExecutor {
    /// Creates an executor where every operation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the operation with the given zero-based index fail.
    #[must_use]
    pub const fn fail_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Makes any operation on the given target fail.
    #[must_use]
    pub fn fail_on_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.fail_target = Some(target.into());
        self
    }

    /// Returns every attempted operation in order, including a failed one.
    #[must_use]
    pub fn operations(&self) -> &[MountOp] {
        &self.ops
    }

    /// Returns the attempted operations rendered as command lines.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.ops.iter().map(ToString::to_string).collect()
    }

    /// Returns `true` if the target currently carries a recorded mount.
    #[must_use]
    pub fn is_mounted(&self, target: &std::path::Path) -> bool {
        self.mounted.contains(target)
    }
}

impl MountExecutor for RecordingExecutor {
    fn execute(&mut self, op: &MountOp) -> Result<()> {
        let index = self.ops.len();
        self.ops.push(op.clone());
        tracing::debug!(index, command = %op, "recorded mount operation");

        let injected = self.fail_at == Some(index)
            || self.fail_target.as_deref() == Some(op.target());
        if injected {
            return Err(StrataError::Mount {
                command: op.to_string(),
                output: "injected failure".into(),
            });
        }

        match op {
            MountOp::Filesystem { target, .. } if self.mounted.contains(target) => {
                Err(StrataError::Mount {
                    command: op.to_string(),
                    output: format!("{}: target is busy", target.display()),
                })
            }
            MountOp::Filesystem { target, .. } | MountOp::Bind { target, .. } => {
                let _ = self.mounted.insert(target.clone());
                Ok(())
            }
            MountOp::DetachUnmount { target } => {
                let _ = self.mounted.remove(target);
                Ok(())
            }
            MountOp::MakeRPrivate { .. } | MountOp::PivotRoot { .. } | MountOp::ChangeDir { .. } => {
                Ok(())
            }
        }
    }
}
