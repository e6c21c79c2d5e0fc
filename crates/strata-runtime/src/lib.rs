//! Worker-side container setup for Strata: the explicit setup context, the
//! ordered mount pipeline, and the supervisor/worker launch.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod context;
pub mod environment;
pub mod pipeline;
pub mod shell;
pub mod supervisor;
pub mod worker;
