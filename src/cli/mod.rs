//! Command-line interface for library-sync.
//!
//! This module provides CLI commands for scanning a music library against
//! the catalog and inspecting the results.

mod commands;

pub use commands::{Cli, Commands, run_command};
