//! Unified error types for the Strata workspace.
//!
//! Every stage of the setup pipeline wraps the underlying failure with the
//! path or operation involved and hands it back to its caller. There is no
//! local recovery anywhere.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::SetupStep;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StrataError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A JSON descriptor could not be decoded.
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// Descriptor that failed to decode.
        path: PathBuf,
        /// Underlying decoding error.
        source: serde_json::Error,
    },

    /// A mount, unmount, or pivot operation failed.
    #[error("`{command}` failed: {output}")]
    Mount {
        /// Equivalent command line of the failed operation.
        command: String,
        /// Combined command output, or the errno description for syscalls.
        output: String,
    },

    /// An input value is malformed.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the invalid input.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The worker phase was invoked with the wrong arguments.
    #[error("usage: {message}")]
    Usage {
        /// Description of the expected invocation.
        message: String,
    },

    /// Creating or waiting on the namespaced worker failed.
    #[error("namespace launch failed: {message}")]
    Namespace {
        /// Description of the failed launch operation.
        message: String,
    },

    /// A pipeline step failed.
    #[error("{step} failed: {source}")]
    Setup {
        /// Step that was running when the failure occurred.
        step: SetupStep,
        /// Underlying error.
        source: Box<StrataError>,
    },

    /// A configuration value or platform is unsupported.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },
}

impl StrataError {
    /// Wraps this error with the pipeline step it occurred in.
    #[must_use]
    pub fn in_step(self, step: SetupStep) -> Self {
        Self::Setup {
            step,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through [`StrataError::Setup`] wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Setup { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StrataError>;
