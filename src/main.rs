//! Library Sync - reconciles a music directory with a track catalog.
//!
//! Every audio file found on disk (or in a beets tag database) is matched
//! against the catalog's known tracks and linked to its release, or kept
//! in the "have" pool of owned but unidentified files. Artist track counts
//! and new-artist candidates are refreshed after each full scan.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod matching;
pub mod metadata;
pub mod model;
pub mod resolver;
pub mod scanner;
pub mod sync;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::from_default_env()
                .add_directive("library_sync=info".parse()?)
                .add_directive("library=info".parse()?),
        )
        .init();

    cli::run_command(&args)
}
