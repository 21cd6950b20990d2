//! Catalog store: the SQLite database holding known tracks and artists.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Provides async operations for:
//! - Track lookup across the `alltracks` and `tracks` views
//! - Upserts of local ownership fields (location, bitrate, format)
//! - The `have` pool of unmatched files and the staged `newartists` list
//! - Per-artist owned-track aggregates
//!
//! # Example
//!
//! ```ignore
//! use library_sync::db::{init_db, db_url};
//!
//! let pool = init_db(&db_url(None)).await?;
//! let artists = list_artists(&pool).await?;
//! ```

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};

use crate::matching::ControlKey;
use crate::model::{Artist, CatalogTrack, HaveEntry, OwnedFile, TrackView};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "library.db";

/// Columns selected into [`CatalogTrack`].
const TRACK_COLUMNS: &str = "artist_id, artist_name, album_title, album_id, release_id, \
     track_title, track_id, clean_name, location, bit_rate, format";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// ============================================================================
// Track lookup and upsert
// ============================================================================

/// Find the first track matching `filter`, checking `alltracks` before
/// `tracks` since the release-restricted view may not be populated yet.
/// Within a view, rows that know their owning album come first.
///
/// `filter` is a trusted `WHERE` clause with one `?` per entry in `params`.
pub async fn find_track(
    pool: &SqlitePool,
    filter: &str,
    params: &[String],
) -> sqlx::Result<Option<CatalogTrack>> {
    for view in TrackView::ALL {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY album_id IS NULL LIMIT 1",
            TRACK_COLUMNS,
            view.table(),
            filter
        );
        let mut query = sqlx::query_as::<_, CatalogTrack>(&sql);
        for param in params {
            query = query.bind(param);
        }
        if let Some(track) = query.fetch_optional(pool).await? {
            return Ok(Some(track));
        }
    }
    Ok(None)
}

/// Set location, bitrate and format on every row of `view` identified by
/// `key`, inserting a row if none exists.
///
/// Inserted rows carry the key columns plus the catalog columns of
/// `catalog`, the row the match was found on. Existing rows with blank
/// catalog columns get them filled from `catalog`; present values are kept.
///
/// Running it twice leaves the same state as running it once.
pub async fn upsert_track(
    conn: &mut SqliteConnection,
    view: TrackView,
    key: &ControlKey,
    catalog: &CatalogTrack,
    file: &OwnedFile,
) -> sqlx::Result<()> {
    let columns = key.columns();
    let filter = columns
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ");

    let descriptive = descriptive_columns(catalog);
    let fill = descriptive
        .iter()
        .map(|(column, _)| format!("{column} = COALESCE({column}, ?)"))
        .collect::<Vec<_>>()
        .join(", ");

    let update = format!(
        "UPDATE {} SET location = ?, bit_rate = ?, format = ?, {} WHERE {}",
        view.table(),
        fill,
        filter
    );
    let mut query = sqlx::query(&update)
        .bind(&file.location)
        .bind(file.bit_rate)
        .bind(&file.format);
    for (_, value) in &descriptive {
        query = query.bind(*value);
    }
    for (_, value) in &columns {
        query = query.bind(*value);
    }
    if query.execute(&mut *conn).await?.rows_affected() > 0 {
        return Ok(());
    }

    // Key values win over the matched row's, e.g. the hybrid key's release
    let mut inserted: Vec<(&str, Option<&str>)> = columns
        .iter()
        .map(|(column, value)| (*column, Some(*value)))
        .collect();
    let identifiers = [
        ("track_id", catalog.track_id.as_deref()),
        ("release_id", catalog.release_id.as_deref()),
    ];
    for (column, value) in identifiers.into_iter().chain(descriptive) {
        if !inserted.iter().any(|(existing, _)| *existing == column) {
            inserted.push((column, value));
        }
    }

    let names = inserted
        .iter()
        .map(|(column, _)| *column)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; inserted.len() + 3].join(", ");
    let insert = format!(
        "INSERT INTO {} ({}, location, bit_rate, format) VALUES ({})",
        view.table(),
        names,
        placeholders
    );
    let mut query = sqlx::query(&insert);
    for (_, value) in &inserted {
        query = query.bind(*value);
    }
    query
        .bind(&file.location)
        .bind(file.bit_rate)
        .bind(&file.format)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Catalog columns describing a track, as opposed to its identifiers and
/// ownership fields.
fn descriptive_columns(catalog: &CatalogTrack) -> [(&'static str, Option<&str>); 6] {
    [
        ("artist_id", catalog.artist_id.as_deref()),
        ("artist_name", catalog.artist_name.as_deref()),
        ("album_title", catalog.album_title.as_deref()),
        ("album_id", catalog.album_id.as_deref()),
        ("track_title", catalog.track_title.as_deref()),
        ("clean_name", catalog.clean_name.as_deref()),
    ]
}

/// All `tracks` rows that currently claim a local file, as (rowid, location).
pub async fn owned_track_locations(pool: &SqlitePool) -> sqlx::Result<Vec<(i64, String)>> {
    sqlx::query_as("SELECT rowid, location FROM tracks WHERE location IS NOT NULL")
        .fetch_all(pool)
        .await
}

/// Mark a `tracks` row as known but not owned.
pub async fn clear_track_location(pool: &SqlitePool, rowid: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE tracks SET location = NULL, bit_rate = NULL, format = NULL WHERE rowid = ?")
        .bind(rowid)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Have pool
// ============================================================================

/// Record an owned file that matched nothing.
pub async fn insert_have(pool: &SqlitePool, entry: &HaveEntry) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO have (
            artist_name, album_title, track_number, track_title, track_length,
            bit_rate, genre, date, track_id, location, clean_name, format
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.artist_name)
    .bind(&entry.album_title)
    .bind(entry.track_number)
    .bind(&entry.track_title)
    .bind(entry.track_length)
    .bind(entry.bit_rate)
    .bind(&entry.genre)
    .bind(&entry.date)
    .bind(&entry.track_id)
    .bind(&entry.location)
    .bind(&entry.clean_name)
    .bind(&entry.format)
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop the whole have pool. Returns the number of rows removed.
pub async fn clear_have(pool: &SqlitePool) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM have").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Have entries, optionally restricted to one artist (case-insensitive).
pub async fn list_have(pool: &SqlitePool, artist_name: Option<&str>) -> sqlx::Result<Vec<HaveEntry>> {
    const SELECT: &str = "SELECT artist_name, album_title, track_number, track_title, track_length, \
         bit_rate, genre, date, track_id, location, clean_name, format FROM have";

    match artist_name {
        Some(name) => {
            let sql = format!(
                r"{SELECT} WHERE artist_name LIKE ? ESCAPE '\' ORDER BY album_title, track_number"
            );
            sqlx::query_as(&sql)
                .bind(crate::matching::like_pattern(name))
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!("{SELECT} ORDER BY artist_name, album_title, track_number");
            sqlx::query_as(&sql).fetch_all(pool).await
        }
    }
}

// ============================================================================
// Artists
// ============================================================================

/// All known artists, ordered by name.
pub async fn list_artists(pool: &SqlitePool) -> sqlx::Result<Vec<Artist>> {
    sqlx::query_as::<_, Artist>(
        "SELECT artist_id, artist_name, have_tracks FROM artists ORDER BY artist_name",
    )
    .fetch_all(pool)
    .await
}

/// Add an artist if its ID is not known yet. Returns true if inserted.
pub async fn insert_artist(pool: &SqlitePool, artist_id: &str, artist_name: &str) -> sqlx::Result<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO artists (artist_id, artist_name) VALUES (?, ?)")
        .bind(artist_id)
        .bind(artist_name)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Owned tracks for an artist: located `tracks` rows for its ID plus have
/// rows whose artist name matches case-insensitively.
///
/// Counted from `tracks` rather than `alltracks`, which holds duplicates
/// across releases.
pub async fn count_have_tracks(
    pool: &SqlitePool,
    artist_id: &str,
    artist_name: &str,
) -> sqlx::Result<i64> {
    let (located,): (i64,) =
        sqlx::query_as("SELECT COUNT(1) FROM tracks WHERE artist_id = ? AND location IS NOT NULL")
            .bind(artist_id)
            .fetch_one(pool)
            .await?;

    let (unmatched,): (i64,) =
        sqlx::query_as(r"SELECT COUNT(1) FROM have WHERE TRIM(artist_name) LIKE ? ESCAPE '\'")
            .bind(crate::matching::like_pattern(artist_name))
            .fetch_one(pool)
            .await?;

    Ok(located + unmatched)
}

/// Persist an artist's owned-track count.
pub async fn set_have_tracks(pool: &SqlitePool, artist_id: &str, have_tracks: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE artists SET have_tracks = ? WHERE artist_id = ?")
        .bind(have_tracks)
        .bind(artist_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace the staged new-artist list in a single transaction.
pub async fn replace_new_artists(pool: &SqlitePool, names: &[String]) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM newartists")
        .execute(&mut *tx)
        .await?;

    for name in names {
        sqlx::query("INSERT OR IGNORE INTO newartists (artist_name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await
}

/// Staged new-artist names, ordered by name.
pub async fn list_new_artists(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar("SELECT artist_name FROM newartists ORDER BY artist_name")
        .fetch_all(pool)
        .await
}
