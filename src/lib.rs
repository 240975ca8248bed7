//! Evalbox library — exposes modules for integration testing.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bundle;
pub mod ci;
pub mod cli;
pub mod command_runner;
pub mod commands;
pub mod harness;
pub mod output;
