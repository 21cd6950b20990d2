//! Applies cascade outcomes to the catalog.

use sqlx::sqlite::SqlitePool;

use crate::db;
use crate::matching::MatchOutcome;
use crate::model::{HaveEntry, SongRecord, TrackView};

/// What happened to a song that matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmatched {
    /// Recorded in the have pool
    Orphaned,
    /// Not enough identifying data to keep
    Discarded,
}

/// Write the song's location, bitrate and format through every control key
/// into both views. Rows missing from a view are created with the matched
/// row's catalog columns.
///
/// All writes for the record share one transaction.
pub async fn apply_match(pool: &SqlitePool, outcome: &MatchOutcome, song: &SongRecord) -> sqlx::Result<()> {
    let file = song.owned_file();
    let mut tx = pool.begin().await?;

    for key in &outcome.keys {
        for view in TrackView::ALL {
            db::upsert_track(&mut *tx, view, key, &outcome.row, &file).await?;
        }
    }

    tx.commit().await
}

/// Record an unmatched song in the have pool, or drop it when artist,
/// album or title is missing. The catalog tracks are never touched.
pub async fn record_unmatched(pool: &SqlitePool, song: &SongRecord, clean_name: &str) -> sqlx::Result<Unmatched> {
    match HaveEntry::from_song(song, clean_name) {
        Some(entry) => {
            db::insert_have(pool, &entry).await?;
            Ok(Unmatched::Orphaned)
        }
        None => Ok(Unmatched::Discarded),
    }
}
