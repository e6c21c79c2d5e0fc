//! # strata-core
//!
//! Low-level Linux isolation primitives for the Strata runtime.
//!
//! This crate provides safe abstractions over:
//! - **Mounting**: a narrow executor capability with syscall, external-tool
//!   and recording implementations.
//! - **Filesystem**: `OverlayFS` assembly, pseudo-filesystems, volume binds
//!   and `pivot_root`.
//! - **Namespaces**: cloning a worker into fresh UTS, IPC, network, mount and
//!   PID namespaces.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! proper error handling and `// SAFETY:` documentation.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod filesystem;
pub mod mount;
pub mod namespace;
