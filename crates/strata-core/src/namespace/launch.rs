//! Spawning a process directly inside new namespaces.

use std::path::Path;

use strata_common::error::{Result, StrataError};

use super::NamespaceSet;

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exited normally with this status code.
    Exited(i32),
    /// Was killed by this signal number.
    Signaled(i32),
}

impl ProcessExit {
    /// Returns the shell-style exit code (`128 + signal` for signals).
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(signal) => 128 + signal,
        }
    }

    /// Returns `true` for a zero exit status.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

/// Clones a child inside `namespaces` that immediately executes `program`
/// with `args`, then blocks until it terminates.
///
/// The child inherits the standard streams and environment. There is no
/// timeout and no signal forwarding.
///
/// # Errors
///
/// Returns an error if an argument contains a NUL byte, if `clone(2)` fails
/// (typically `EPERM` without `CAP_SYS_ADMIN`), or if waiting fails.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub fn spawn_in_namespaces(
    namespaces: &NamespaceSet,
    program: &Path,
    args: &[String],
) -> Result<ProcessExit> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    use nix::errno::Errno;
    use nix::sched::clone;
    use nix::sys::wait::{WaitStatus, waitpid};
    use nix::unistd::execv;

    let to_cstring = |bytes: &[u8]| {
        CString::new(bytes).map_err(|_| StrataError::Config {
            message: format!(
                "argument `{}` contains a NUL byte",
                String::from_utf8_lossy(bytes)
            ),
        })
    };
    let program_c = to_cstring(program.as_os_str().as_bytes())?;
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(program_c.clone());
    for arg in args {
        argv.push(to_cstring(arg.as_bytes())?);
    }

    let flags = namespaces.clone_flags();
    tracing::info!(program = %program.display(), ?args, ?flags, "cloning into new namespaces");

    let mut stack = vec![0_u8; strata_common::constants::CLONE_STACK_SIZE];
    let child: nix::sched::CloneCb<'_> = Box::new(|| {
        // Only reached if exec fails.
        let _ = execv(&program_c, &argv);
        127
    });
    // SAFETY: the callback only calls execv(2) with arguments allocated before
    // the clone and returns on failure; the stack outlives the child's use of
    // it because the child replaces its image or exits.
    let pid = unsafe { clone(child, &mut stack, flags, Some(libc::SIGCHLD)) }.map_err(|e| {
        StrataError::Namespace {
            message: format!("clone({flags:?}) failed: {e}"),
        }
    })?;
    tracing::debug!(pid = pid.as_raw(), "worker cloned");

    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                tracing::debug!(pid = pid.as_raw(), code, "worker exited");
                return Ok(ProcessExit::Exited(code));
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                tracing::debug!(pid = pid.as_raw(), signal = ?signal, "worker killed");
                return Ok(ProcessExit::Signaled(signal as i32));
            }
            Ok(_) | Err(Errno::EINTR) => {}
            Err(e) => {
                return Err(StrataError::Namespace {
                    message: format!("waitpid({pid}) failed: {e}"),
                });
            }
        }
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn spawn_in_namespaces(
    _namespaces: &NamespaceSet,
    _program: &Path,
    _args: &[String],
) -> Result<ProcessExit> {
    Err(StrataError::Config {
        message: "Linux required for native container operations".into(),
    })
}
