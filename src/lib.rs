//! ragup library — exposes modules for integration testing.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cli;
pub mod command_runner;
pub mod compose;
pub mod context;
pub mod lifecycle;
pub mod output;
pub mod readiness;
pub mod status;
pub mod supervisor;
