//! Filesystem management for container isolation.
//!
//! Provides OverlayFS assembly, pseudo-filesystem and volume mounts, and
//! `pivot_root` for switching into the assembled tree.

pub mod mount;
pub mod overlayfs;
pub mod pivot_root;
