//! Per-artist aggregates, new-artist detection and pre-scan cleanup.

use sqlx::sqlite::SqlitePool;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::db;
use crate::model::Artist;

/// What the pre-scan cleanup removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cleanup {
    /// `tracks` rows whose file disappeared
    pub stale_locations: usize,
    /// Have entries dropped for rebuilding
    pub have_entries: u64,
}

/// Reset `tracks` rows whose file is gone to "known but unowned", then
/// drop the have pool. Full scans only.
pub async fn prepare_full_scan(pool: &SqlitePool) -> sqlx::Result<Cleanup> {
    info!(target: "library::sync", "Checking existing tracks");

    let mut cleanup = Cleanup::default();
    for (rowid, location) in db::owned_track_locations(pool).await? {
        if !Path::new(&location).is_file() {
            debug!(target: "library::sync", location = %location, "File gone, clearing location");
            db::clear_track_location(pool, rowid).await?;
            cleanup.stale_locations += 1;
        }
    }

    cleanup.have_entries = db::clear_have(pool).await?;
    Ok(cleanup)
}

/// Drop repeated names, ignoring case. The first spelling wins and order
/// is kept.
pub fn dedupe_case_insensitive<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}

/// Names not matching any known artist, ignoring case.
pub fn new_artist_candidates(seen: &[String], known: &[Artist]) -> Vec<String> {
    let known: HashSet<String> = known.iter().map(|a| a.artist_name.to_lowercase()).collect();
    seen.iter()
        .filter(|name| !known.contains(&name.to_lowercase()))
        .cloned()
        .collect()
}

/// Recompute and store the owned-track count of one artist.
pub async fn refresh_artist(pool: &SqlitePool, artist_id: &str, artist_name: &str) -> sqlx::Result<i64> {
    let have_tracks = db::count_have_tracks(pool, artist_id, artist_name).await?;
    db::set_have_tracks(pool, artist_id, have_tracks).await?;
    Ok(have_tracks)
}

/// Recompute the owned-track count of every known artist. Returns how many
/// artists were refreshed.
pub async fn refresh_all(pool: &SqlitePool) -> sqlx::Result<usize> {
    info!(target: "library::sync", "Updating current artist track counts");

    let artists = db::list_artists(pool).await?;
    for artist in &artists {
        refresh_artist(pool, &artist.artist_id, &artist.artist_name).await?;
    }
    Ok(artists.len())
}
