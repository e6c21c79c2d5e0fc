//! Loading of the on-disk image descriptors.
//!
//! The external puller writes `config.json` and `manifest.json` next to the
//! extracted layers. Only `config.Env` and `Layers` are consumed. Decoding is
//! lenient: unknown fields are ignored and missing fields fall back to empty
//! values, so an empty result is logged as a warning instead of rejected.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use strata_common::error::{Result, StrataError};

use crate::layer::LayerDescriptor;

/// Image config document: `{"config": {"Env": [...]}}`.
#[derive(Debug, Default, Deserialize)]
struct ImageConfig {
    #[serde(alias = "Config", default)]
    config: RuntimeConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RuntimeConfig {
    #[serde(rename = "Env", alias = "env", default)]
    env: Vec<String>,
}

/// Image manifest document: `{"Layers": [...]}`.
#[derive(Debug, Default, Deserialize)]
struct ImageManifest {
    #[serde(rename = "Layers", alias = "layers", default)]
    layers: Vec<LayerDescriptor>,
}

fn decode_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| StrataError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| StrataError::Decode {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Loads the ordered `KEY=VALUE` environment list from an image config.
///
/// # Errors
///
/// Returns [`StrataError::Io`] if the file cannot be opened and
/// [`StrataError::Decode`] if it is not valid JSON of the expected shape.
pub fn load_environment(path: &Path) -> Result<Vec<String>> {
    let config: ImageConfig = decode_file(path)?;
    let env = config.config.env;
    if env.is_empty() {
        tracing::warn!(path = %path.display(), "image config declares no environment");
    }
    tracing::debug!(path = %path.display(), entries = env.len(), "loaded image environment");
    Ok(env)
}

/// Loads the ordered, base-first layer list from an image manifest.
///
/// # Errors
///
/// Returns [`StrataError::Io`] if the file cannot be opened and
/// [`StrataError::Decode`] if it is not valid JSON of the expected shape.
pub fn load_manifest(path: &Path) -> Result<Vec<LayerDescriptor>> {
    let manifest: ImageManifest = decode_file(path)?;
    if manifest.layers.is_empty() {
        tracing::warn!(path = %path.display(), "image manifest lists no layers");
    }
    tracing::debug!(path = %path.display(), layers = manifest.layers.len(), "loaded image manifest");
    Ok(manifest.layers)
}
