//! Filesystem layer descriptors.
//!
//! Each image is composed of ordered layers, listed base-first in the
//! manifest. Layers are content-addressed by their digest and already
//! extracted into the local layer cache by the external puller.

use serde::{Deserialize, Serialize};
use strata_common::error::Result;
use strata_common::types::Digest;

/// A single filesystem layer as listed in an image manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Content digest, `algorithm:hex`.
    #[serde(rename = "Digest", alias = "digest", default)]
    pub digest: String,
    /// Media type of the layer blob.
    #[serde(rename = "MediaType", alias = "mediaType", default)]
    pub media_type: String,
    /// Size of the layer blob in bytes.
    #[serde(rename = "Size", alias = "size", default)]
    pub size: u64,
}

impl LayerDescriptor {
    /// Parses the digest of this layer.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the digest is not `algorithm:hex`.
    pub fn parsed_digest(&self) -> Result<Digest> {
        Digest::parse(&self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_digest_exposes_hex() {
        let layer = LayerDescriptor {
            digest: "sha256:deadbeef".into(),
            ..LayerDescriptor::default()
        };
        assert_eq!(layer.parsed_digest().expect("digest").hex(), "deadbeef");
    }

    #[test]
    fn parsed_digest_rejects_empty_digest() {
        assert!(LayerDescriptor::default().parsed_digest().is_err());
    }
}
