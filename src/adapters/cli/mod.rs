//! CLI Adapter
//!
//! Command-line interface for the tradepost scheduler.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, ReclassifyCmd, RequestCmd, StatusCmd, UpdateCmd};
