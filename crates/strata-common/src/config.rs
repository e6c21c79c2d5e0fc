//! Configuration model for a Strata run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::StrataError;

/// How mount operations are carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Direct `mount(2)`/`umount2(2)` system calls.
    #[default]
    Syscall,
    /// The host's `mount` and `umount` binaries.
    Command,
}

impl ExecutorKind {
    /// Returns the command-line spelling of this executor.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Syscall => "syscall",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutorKind {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "syscall" => Ok(Self::Syscall),
            "command" => Ok(Self::Command),
            other => Err(StrataError::Config {
                message: format!("unknown executor `{other}` (expected `syscall` or `command`)"),
            }),
        }
    }
}

/// Root configuration for one Strata run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrataConfig {
    /// Path to the image `config.json`.
    pub config_path: PathBuf,
    /// Path to the image `manifest.json`.
    pub manifest_path: PathBuf,
    /// Directory where the tmpfs-backed overlay is assembled.
    pub base_dir: PathBuf,
    /// Host directory bound at `/volume` inside the container.
    pub volume_dir: PathBuf,
    /// Layer cache root holding one extracted directory per digest.
    pub layer_root: PathBuf,
    /// Shell started after the root switch.
    pub shell: PathBuf,
    /// Mount executor used by the worker.
    pub executor: ExecutorKind,
    /// Whether to lazily unmount already-performed mounts when a step fails.
    pub unwind_on_failure: bool,
}

impl StrataConfig {
    /// Builds the conventional layout rooted at an image directory.
    #[must_use]
    pub fn from_image_dir(image_dir: &Path) -> Self {
        Self {
            config_path: image_dir.join(constants::CONFIG_FILE),
            manifest_path: image_dir.join(constants::MANIFEST_FILE),
            base_dir: image_dir.join(constants::OVERLAY_DIR),
            volume_dir: image_dir.join(constants::VOLUME_DIR),
            layer_root: image_dir.join(constants::LAYERS_DIR),
            shell: PathBuf::from(constants::DEFAULT_SHELL),
            executor: ExecutorKind::default(),
            unwind_on_failure: false,
        }
    }
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self::from_image_dir(&constants::default_image_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_lives_under_image_dir() {
        let config = StrataConfig::default();
        assert_eq!(config.config_path, PathBuf::from("/tmp/strata/image/config.json"));
        assert_eq!(config.manifest_path, PathBuf::from("/tmp/strata/image/manifest.json"));
        assert_eq!(config.base_dir, PathBuf::from("/tmp/strata/image/overlay"));
        assert_eq!(config.volume_dir, PathBuf::from("/tmp/strata/image/volume"));
        assert_eq!(config.layer_root, PathBuf::from("/tmp/strata/image/layers"));
        assert_eq!(config.shell, PathBuf::from("/bin/sh"));
        assert_eq!(config.executor, ExecutorKind::Syscall);
        assert!(!config.unwind_on_failure);
    }

    #[test]
    fn executor_kind_parses_both_spellings() {
        assert_eq!("syscall".parse::<ExecutorKind>().unwrap(), ExecutorKind::Syscall);
        assert_eq!("command".parse::<ExecutorKind>().unwrap(), ExecutorKind::Command);
        assert!("shell".parse::<ExecutorKind>().is_err());
    }

    #[test]
    fn config_serializes_executor_lowercase() {
        let json = serde_json::to_string(&StrataConfig::default()).unwrap();
        assert!(json.contains("\"executor\":\"syscall\""));
    }
}
