//! # strata-image
//!
//! Image descriptor handling for the Strata runtime.
//!
//! Handles:
//! - **Descriptors**: decoding `config.json` and `manifest.json`.
//! - **Layers**: manifest layer entries and their digests.
//! - **Storage**: lookup of pre-extracted layers in the local cache.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod descriptor;
pub mod layer;
pub mod storage;
