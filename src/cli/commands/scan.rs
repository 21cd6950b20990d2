//! Library scan command.

use std::path::Path;
use tokio::runtime::Runtime;
use tracing::info;

use super::CatalogArgs;
use crate::config;
use crate::db;
use crate::resolver::MusicBrainzResolver;
use crate::sync::{LibrarySync, ScanMode, ScanSummary, SyncOptions};

/// Scan the library and reconcile it with the catalog.
///
/// `append` carries the (artist ID, artist name) the scanned directory
/// belongs to.
pub fn cmd_scan(
    rt: &Runtime,
    args: &CatalogArgs,
    path: Option<&Path>,
    append: Option<(String, String)>,
    scheduled: bool,
) -> anyhow::Result<()> {
    let mut config = args.load_config();

    if scheduled && !config.library.library_scan {
        info!(target: "library::sync", "Library scan is disabled; skipping scheduled scan");
        return Ok(());
    }

    let root = path
        .map(Path::to_path_buf)
        .or_else(|| config.library.music_dir.clone())
        .ok_or_else(|| anyhow::anyhow!("No directory given and no music_dir configured"))?;

    let mode = match append {
        Some((artist_id, artist_name)) => ScanMode::Append {
            artist_id,
            artist_name,
        },
        None => ScanMode::Full,
    };
    let full = mode.is_full();
    let options = SyncOptions::from_config(&config, root.clone(), mode);
    let db_url = db::db_url(args.db_path(&config));

    let summary = rt.block_on(async {
        let pool = db::init_db(&db_url).await?;

        let mut sync = LibrarySync::new(pool, options);
        if config.artists.auto_import && full {
            sync = sync.with_resolver(Box::new(MusicBrainzResolver::new(
                config.artists.musicbrainz_contact.as_deref(),
            )?));
        }

        println!("Scanning directory: {}", root.display());
        anyhow::Ok(sync.run().await?)
    })?;

    print_summary(&summary);

    if let Some(kbps) = summary.detected_bitrate {
        config.quality.preferred_bitrate = Some(kbps);
        match &args.config {
            Some(path) => config::save_to(&config, path)?,
            None => config::save(&config)?,
        }
        println!("Preferred bitrate set to {} kbps", kbps);
    }

    Ok(())
}

fn print_summary(summary: &ScanSummary) {
    println!(
        "\nScan complete in {}: {} tracks, {} matched, {} orphaned, {} skipped",
        crate::sync::progress::format_duration(summary.elapsed),
        summary.total,
        summary.matched(),
        summary.orphaned,
        summary.discarded
    );

    for (strategy, count) in &summary.by_strategy {
        println!("  {:>6}  by {}", count, strategy);
    }
    if summary.unreadable > 0 {
        println!("{} files could not be read", summary.unreadable);
    }
    if summary.stale_locations_cleared > 0 {
        println!("{} tracks no longer found on disk", summary.stale_locations_cleared);
    }
    if !summary.new_artists.is_empty() {
        println!("{} new artists: {}", summary.new_artists.len(), summary.new_artists.join(", "));
        if summary.artists_imported > 0 {
            println!("{} artists imported", summary.artists_imported);
        }
    }
}
