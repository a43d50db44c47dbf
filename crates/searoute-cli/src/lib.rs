//! Searoute CLI library.
//!
//! Subcommand handlers, logging setup and output helpers for the
//! `searoute-cli` binary.

pub mod commands;
pub mod logging;
pub mod output;
