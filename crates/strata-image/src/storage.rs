//! Local layer cache lookup.
//!
//! The external puller extracts every layer into `<root>/<hex>`, where
//! `<hex>` is the content part of the layer digest.

use std::path::{Path, PathBuf};

use strata_common::error::{Result, StrataError};
use strata_common::types::Digest;

use crate::layer::LayerDescriptor;

/// Read-only view of the extracted layer cache.
#[derive(Debug, Clone)]
pub struct LayerStore {
    /// Root directory holding one directory per layer.
    root: PathBuf,
}

impl LayerStore {
    /// Opens the layer cache at the given root.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        tracing::debug!(path = %root.display(), "opening layer cache");
        Self { root }
    }

    /// Returns the path to a layer's extracted directory given its digest.
    #[must_use]
    pub fn layer_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.hex())
    }

    /// Checks whether a layer has been extracted into the cache.
    #[must_use]
    pub fn has_layer(&self, digest: &Digest) -> bool {
        self.layer_path(digest).is_dir()
    }

    /// Resolves a manifest layer to its extracted directory.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed digest and
    /// [`StrataError::NotFound`] if the layer directory does not exist.
    pub fn resolve(&self, layer: &LayerDescriptor) -> Result<PathBuf> {
        let digest = layer.parsed_digest()?;
        if !self.has_layer(&digest) {
            return Err(StrataError::NotFound {
                kind: "layer directory",
                id: self.layer_path(&digest).display().to_string(),
            });
        }
        Ok(self.layer_path(&digest))
    }

    /// Returns the root cache path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
