//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `scan`: Library scan reconciliation
//! - `catalog`: Artist, orphan and new-artist listings

mod catalog;
mod scan;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::{self, Config};

pub use catalog::{cmd_artists, cmd_new_artists, cmd_orphans};
pub use scan::cmd_scan;

/// Library Sync CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct CatalogArgs {
    /// Catalog database path (defaults to the configured one, then ./library.db)
    #[arg(long, env = "LIBRARY_SYNC_DB")]
    pub db: Option<PathBuf>,
    /// Config file path (defaults to the OS config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CatalogArgs {
    /// Load the config file named on the command line, or the default one.
    pub fn load_config(&self) -> Config {
        match &self.config {
            Some(path) => config::load_from(path),
            None => config::load(),
        }
    }

    /// Database path: command line, then config, then the default name.
    pub fn db_path<'a>(&'a self, config: &'a Config) -> Option<&'a Path> {
        self.db.as_deref().or(config.library.database.as_deref())
    }
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan the music directory and match files to the catalog
    Scan {
        /// Directory to scan (defaults to the configured music directory)
        path: Option<PathBuf>,
        /// Scan a single newly added directory instead of the whole library
        #[arg(long, requires_all = ["artist_id", "artist_name"])]
        append: bool,
        /// Artist the appended directory belongs to
        #[arg(long)]
        artist_id: Option<String>,
        /// Name of the artist the appended directory belongs to
        #[arg(long)]
        artist_name: Option<String>,
        /// Invoked by a scheduler; does nothing when library scans are disabled
        #[arg(long)]
        scheduled: bool,
        #[command(flatten)]
        catalog: CatalogArgs,
    },
    /// List known artists with their owned-track counts
    Artists {
        #[command(flatten)]
        catalog: CatalogArgs,
    },
    /// List artists found on disk that are staged for review
    NewArtists {
        #[command(flatten)]
        catalog: CatalogArgs,
    },
    /// List owned files that matched no catalog track
    Orphans {
        /// Only show entries for this artist (case-insensitive)
        #[arg(long)]
        artist: Option<String>,
        #[command(flatten)]
        catalog: CatalogArgs,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Scan {
            path,
            append,
            artist_id,
            artist_name,
            scheduled,
            catalog,
        } => {
            let append = match (append, artist_id, artist_name) {
                (true, Some(id), Some(name)) => Some((id.clone(), name.clone())),
                _ => None,
            };
            cmd_scan(&rt, catalog, path.as_deref(), append, *scheduled)
        }
        Commands::Artists { catalog } => cmd_artists(&rt, catalog),
        Commands::NewArtists { catalog } => cmd_new_artists(&rt, catalog),
        Commands::Orphans { artist, catalog } => cmd_orphans(&rt, catalog, artist.as_deref()),
    }
}
