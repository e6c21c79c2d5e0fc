//! Applying the image environment to the setup context.

use strata_common::error::{Result, StrataError};

use crate::context::ContainerSetupContext;

/// Splits a `KEY=VALUE` entry on its first `=`.
///
/// The value may itself contain `=`; an entry without any `=` or with an
/// empty key is malformed.
///
/// # Errors
///
/// Returns [`StrataError::Validation`] for a malformed entry.
pub fn parse_entry(entry: &str) -> Result<(String, String)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(StrataError::Validation {
            message: format!("invalid environment entry `{entry}`"),
        }),
    }
}

/// Applies entries to the context in order.
///
/// Stops at the first malformed entry. Entries before it stay applied and
/// entries after it are not applied.
///
/// # Errors
///
/// Returns [`StrataError::Validation`] for the first malformed entry.
pub fn apply_environment(ctx: &mut ContainerSetupContext, entries: &[String]) -> Result<()> {
    tracing::info!(count = entries.len(), "setting environment variables");
    for entry in entries {
        let (key, value) = parse_entry(entry)?;
        tracing::debug!(%key, "environment variable set");
        ctx.environment.push((key, value));
    }
    Ok(())
}
