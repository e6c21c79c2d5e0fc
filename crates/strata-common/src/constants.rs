//! System-wide constants and default paths.

use std::path::{Path, PathBuf};

/// Default image directory populated by the external layer puller.
pub const DEFAULT_IMAGE_DIR: &str = "/tmp/strata/image";

/// Image config descriptor file name (holds `config.Env`).
pub const CONFIG_FILE: &str = "config.json";
/// Image manifest descriptor file name (holds `Layers`).
pub const MANIFEST_FILE: &str = "manifest.json";
/// Directory under the image directory where the overlay is assembled.
pub const OVERLAY_DIR: &str = "overlay";
/// Host directory bound into the container.
pub const VOLUME_DIR: &str = "volume";
/// Layer cache directory holding one extracted directory per digest hex.
pub const LAYERS_DIR: &str = "layers";

/// Overlay writable layer, relative to the base directory.
pub const UPPER_DIR: &str = "upper";
/// Overlay scratch directory, relative to the base directory.
pub const WORK_DIR: &str = "work";
/// Overlay union mount point, relative to the base directory.
pub const MERGED_DIR: &str = "merged";
/// Volume mount point, relative to the merged directory.
pub const VOLUME_MOUNT_POINT: &str = "volume";

/// Sentinel subcommand telling the re-executed binary to run the worker phase.
pub const CHILD_SENTINEL: &str = "child";

/// Number of positional arguments the worker phase accepts.
pub const WORKER_ARG_COUNT: usize = 4;

/// Path used to re-execute the running binary.
pub const SELF_EXE: &str = "/proc/self/exe";

/// Shell started once the root has been switched.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Stack size handed to `clone(2)` for the worker process.
pub const CLONE_STACK_SIZE: usize = 1024 * 1024;

/// Returns the default image directory.
#[must_use]
pub fn default_image_dir() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGE_DIR)
}

/// Returns the merged directory for a given overlay base directory.
#[must_use]
pub fn merged_dir(base_dir: &Path) -> PathBuf {
    base_dir.join(MERGED_DIR)
}
