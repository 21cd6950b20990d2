//! Test utilities and fixtures for library-sync tests.
//!
//! This module provides common test helpers, mock implementations of the
//! external collaborator traits, and catalog seeding helpers.
//!
//! # Example
//!
//! ```ignore
//! use library_sync::test_utils::{temp_db, catalog_track, insert_catalog_track};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, _dir) = temp_db().await;
//!     insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "a1")).await;
//!     // ... test logic
//! }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::metadata::{TagData, TagReader};
use crate::model::{CatalogTrack, OwnedFile, SongRecord, TrackView};
use crate::resolver::{ArtistResolver, ResolvedArtist};
use crate::scanner::beets::{TagDatabase, TagDatabaseItem};

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// ```ignore
/// let (pool, _dir) = temp_db().await;
/// // Database is deleted when _dir goes out of scope
/// ```
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");

    let pool = crate::db::init_db(&crate::db::db_url(Some(&db_path)))
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// A song with artist "Foo", album "Bar", title "Baz" and no IDs.
///
/// Customize using struct update syntax:
///
/// ```ignore
/// let strong = SongRecord { track_id: Some("t1".into()), ..song("/music/a.mp3") };
/// ```
pub fn song(location: &str) -> SongRecord {
    SongRecord {
        artist_name: Some("Foo".to_string()),
        album_title: Some("Bar".to_string()),
        track_title: Some("Baz".to_string()),
        track_number: Some(1),
        track_length: Some(215.0),
        bit_rate: Some(320_000),
        format: Some("MP3".to_string()),
        location: location.to_string(),
        ..Default::default()
    }
}

/// Tag data equivalent to [`song`], for feeding the mock tag reader.
pub fn tags() -> TagData {
    TagData {
        artist: Some("Foo".to_string()),
        album: Some("Bar".to_string()),
        title: Some("Baz".to_string()),
        track_number: Some(1),
        length: Some(215.0),
        bit_rate: Some(320_000),
        format: Some("MP3".to_string()),
        ..Default::default()
    }
}

/// Ownership fields as a match would write them.
pub fn owned_file(location: &str) -> OwnedFile {
    OwnedFile {
        location: location.to_string(),
        bit_rate: Some(320_000),
        format: Some("MP3".to_string()),
    }
}

/// An unowned catalog row for "Foo - Bar - Baz" by artist `artist-foo`.
pub fn catalog_track(track_id: &str, release_id: &str, album_id: &str) -> CatalogTrack {
    CatalogTrack {
        artist_id: Some("artist-foo".to_string()),
        artist_name: Some("Foo".to_string()),
        album_title: Some("Bar".to_string()),
        album_id: Some(album_id.to_string()),
        release_id: Some(release_id.to_string()),
        track_title: Some("Baz".to_string()),
        track_id: Some(track_id.to_string()),
        clean_name: Some("foo bar baz".to_string()),
        ..Default::default()
    }
}

/// Seed a catalog row into one view.
pub async fn insert_catalog_track(pool: &SqlitePool, view: TrackView, track: &CatalogTrack) {
    let sql = format!(
        "INSERT INTO {} (artist_id, artist_name, album_title, album_id, release_id, \
         track_title, track_id, clean_name, location, bit_rate, format) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        view.table()
    );
    sqlx::query(&sql)
        .bind(&track.artist_id)
        .bind(&track.artist_name)
        .bind(&track.album_title)
        .bind(&track.album_id)
        .bind(&track.release_id)
        .bind(&track.track_title)
        .bind(&track.track_id)
        .bind(&track.clean_name)
        .bind(&track.location)
        .bind(track.bit_rate)
        .bind(&track.format)
        .execute(pool)
        .await
        .expect("Failed to insert catalog track");
}

/// All rows of one view with the given track ID, ordered by release.
pub async fn tracks_where(pool: &SqlitePool, view: TrackView, track_id: &str) -> Vec<CatalogTrack> {
    let sql = format!(
        "SELECT artist_id, artist_name, album_title, album_id, release_id, track_title, \
         track_id, clean_name, location, bit_rate, format FROM {} WHERE track_id = ? \
         ORDER BY release_id",
        view.table()
    );
    sqlx::query_as(&sql)
        .bind(track_id)
        .fetch_all(pool)
        .await
        .expect("Failed to query catalog tracks")
}

/// Row count of any table.
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(1) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows");
    count
}

/// Create empty placeholder files; the mock tag reader supplies their tags.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create directory");
    }
    std::fs::File::create(&path).expect("Failed to create file");
    path
}

// ============================================================================
// Mock collaborators
// ============================================================================

/// Tag reader returning canned tags per path; unknown paths are unreadable.
#[derive(Default)]
pub struct MockTagReader {
    pub tags: HashMap<PathBuf, TagData>,
}

impl MockTagReader {
    pub fn with(mut self, path: impl Into<PathBuf>, tags: TagData) -> Self {
        self.tags.insert(path.into(), tags);
        self
    }
}

impl TagReader for MockTagReader {
    fn read(&self, path: &Path) -> Result<TagData> {
        self.tags
            .get(path)
            .cloned()
            .ok_or_else(|| Error::metadata(path, "not an audio file"))
    }
}

/// Tag database returning a fixed item list.
#[derive(Default)]
pub struct MockTagDatabase {
    pub items: Vec<TagDatabaseItem>,
}

#[async_trait]
impl TagDatabase for MockTagDatabase {
    async fn items_under(&self, root: &Path) -> Result<Vec<TagDatabaseItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| Path::new(&item.path).starts_with(root))
            .cloned()
            .collect())
    }
}

/// Resolver mapping every name to `mbid-<lowercased name>`, except names
/// listed in `unknown`.
#[derive(Default)]
pub struct MockResolver {
    pub unknown: Vec<String>,
}

#[async_trait]
impl ArtistResolver for MockResolver {
    async fn resolve(&self, names: &[String]) -> Result<Vec<ResolvedArtist>> {
        Ok(names
            .iter()
            .filter(|name| !self.unknown.contains(name))
            .map(|name| ResolvedArtist {
                query: name.clone(),
                artist_id: format!("mbid-{}", name.to_lowercase()),
                artist_name: name.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;
        assert_eq!(count_rows(&pool, "alltracks").await, 0);
        assert_eq!(count_rows(&pool, "have").await, 0);
    }

    #[tokio::test]
    async fn test_insert_catalog_track() {
        let (pool, _dir) = temp_db().await;
        insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "a1")).await;

        let rows = tracks_where(&pool, TrackView::AllTracks, "t1").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].album_id.as_deref(), Some("a1"));
    }

    #[test]
    fn test_mock_tag_reader() {
        let reader = MockTagReader::default().with("/music/a.mp3", tags());
        assert!(reader.read(Path::new("/music/a.mp3")).is_ok());
        assert!(reader.read(Path::new("/music/b.mp3")).is_err());
    }
}
