//! Domain primitive types used across the Strata workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// Content-addressed layer identifier of the form `algorithm:hex`.
///
/// Deserializes through [`Digest::parse`], so a decoded digest is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    /// Parses a digest string such as `sha256:4f5c…`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Validation`] if the separator is missing, either
    /// side is empty, or the hex part contains non-hex characters.
    pub fn parse(value: &str) -> Result<Self> {
        let Some((algorithm, hex)) = value.split_once(':') else {
            return Err(StrataError::Validation {
                message: format!("digest `{value}` is missing the `algorithm:` prefix"),
            });
        };
        if algorithm.is_empty() || hex.is_empty() {
            return Err(StrataError::Validation {
                message: format!("digest `{value}` has an empty algorithm or hex part"),
            });
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StrataError::Validation {
                message: format!("digest `{value}` has a non-hex content part"),
            });
        }
        Ok(Self {
            algorithm: algorithm.to_owned(),
            hex: hex.to_owned(),
        })
    }

    /// Returns the hashing algorithm, e.g. `sha256`.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the hex-encoded content hash.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl TryFrom<String> for Digest {
    type Error = StrataError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// A step of the worker setup pipeline, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetupStep {
    /// Making the root mount recursively private.
    Propagation,
    /// Loading and applying the image environment.
    Environment,
    /// Loading the manifest and assembling the overlay.
    Overlay,
    /// Mounting proc, sys, dev and friends.
    BaseFilesystems,
    /// Binding the host volume.
    Volume,
    /// Pivoting into the merged tree.
    RootSwitch,
    /// Running the interactive shell.
    Shell,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Propagation => "mount propagation",
            Self::Environment => "environment setup",
            Self::Overlay => "overlay assembly",
            Self::BaseFilesystems => "base filesystem mounting",
            Self::Volume => "volume binding",
            Self::RootSwitch => "root switch",
            Self::Shell => "shell",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of the worker setup pipeline.
///
/// States only move forward; the first error moves the pipeline into the
/// terminal [`SetupState::Failed`] state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupState {
    /// Nothing has been mounted yet.
    Unmounted,
    /// The tmpfs backing the overlay metadata is mounted on the base directory.
    TmpfsReady,
    /// The overlay union is mounted on the merged directory.
    OverlayReady,
    /// Pseudo-filesystems are mounted inside the merged tree.
    BaseFsReady,
    /// The host volume is bound inside the merged tree.
    VolumeReady,
    /// The process root is the merged tree.
    RootSwitched,
    /// The interactive shell has been started.
    ShellRunning,
    /// A step failed; no further steps are attempted.
    Failed {
        /// Step that failed.
        step: SetupStep,
        /// Rendered cause of the failure.
        cause: String,
    },
}

impl SetupState {
    /// Returns `true` once the pipeline has failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmounted => write!(f, "unmounted"),
            Self::TmpfsReady => write!(f, "tmpfs-ready"),
            Self::OverlayReady => write!(f, "overlay-ready"),
            Self::BaseFsReady => write!(f, "basefs-ready"),
            Self::VolumeReady => write!(f, "volume-ready"),
            Self::RootSwitched => write!(f, "root-switched"),
            Self::ShellRunning => write!(f, "shell-running"),
            Self::Failed { step, .. } => write!(f, "failed ({step})"),
        }
    }
}
