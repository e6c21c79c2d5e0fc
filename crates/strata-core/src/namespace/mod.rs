//! Linux namespace management for container isolation.
//!
//! Namespaces are never entered by the calling process itself: the worker is
//! created directly inside them by `clone(2)` (see [`launch`]), which makes it
//! PID 1 of its own PID namespace.

pub mod launch;

#[cfg(target_os = "linux")]
use nix::sched::CloneFlags;

/// Which namespaces the worker process is created in.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceSet {
    /// Isolate hostname and domain name.
    pub uts: bool,
    /// Isolate System V IPC and POSIX message queues.
    pub ipc: bool,
    /// Isolate the network stack. Created empty; nothing is configured in it.
    pub network: bool,
    /// Isolate the mount table.
    pub mount: bool,
    /// Isolate the process ID space.
    pub pid: bool,
}

impl Default for NamespaceSet {
    fn default() -> Self {
        Self {
            uts: true,
            ipc: true,
            network: true,
            mount: true,
            pid: true,
        }
    }
}

impl NamespaceSet {
    /// Returns the `clone(2)` flags for the requested namespaces.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn clone_flags(&self) -> CloneFlags {
        let mut flags = CloneFlags::empty();
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        if self.ipc {
            flags |= CloneFlags::CLONE_NEWIPC;
        }
        if self.network {
            flags |= CloneFlags::CLONE_NEWNET;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        flags
    }
}
