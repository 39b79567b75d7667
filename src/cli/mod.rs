//! Command-line interface for tidepool.
//!
//! This module provides CLI commands for searching the configured mirrors,
//! resolving stream URLs and listing album tracks without an audio engine.

mod commands;

pub use commands::{Cli, Commands, run_command};
