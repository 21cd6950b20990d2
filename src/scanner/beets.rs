//! Tag database source: songs read from a beets library instead of the
//! files themselves.
//!
//! beets keeps its items in an SQLite database (`library.db`), with the
//! item path stored as raw bytes. Only items under the scan root are used.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::{Enumeration, is_audio_file};
use crate::error::{Error, Result, ResultExt};
use crate::metadata::TagData;
use crate::model::SongRecord;

/// One item from a tag database: its tags plus raw date components.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDatabaseItem {
    pub path: String,
    pub tags: TagData,
    pub year: i64,
    pub month: i64,
    pub day: i64,
}

/// External tag database restricted to a path prefix.
#[async_trait]
pub trait TagDatabase: Send + Sync {
    async fn items_under(&self, root: &Path) -> Result<Vec<TagDatabaseItem>>;
}

/// Read-only handle on a beets `library.db`.
pub struct BeetsLibrary {
    pool: SqlitePool,
    path: PathBuf,
}

impl BeetsLibrary {
    /// Open the library. A missing file is [`Error::SourceUnreadable`].
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            error!(target: "library::scanner", path = %path.display(), "Could not find beets library; aborting");
            return Err(Error::source_unreadable(path));
        }

        let options = SqliteConnectOptions::new().filename(path).read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(format!("opening beets library {}", path.display()))?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    path: Vec<u8>,
    mb_trackid: Option<String>,
    mb_albumid: Option<String>,
    artist: Option<String>,
    albumartist: Option<String>,
    album: Option<String>,
    track: Option<i64>,
    length: Option<f64>,
    genre: Option<String>,
    year: Option<i64>,
    month: Option<i64>,
    day: Option<i64>,
    title: Option<String>,
    bitrate: Option<i64>,
    format: Option<String>,
}

impl ItemRow {
    fn into_item(self, path: String) -> TagDatabaseItem {
        TagDatabaseItem {
            path,
            tags: TagData {
                track_id: self.mb_trackid,
                release_id: self.mb_albumid,
                artist: self.artist,
                album_artist: self.albumartist,
                album: self.album,
                title: self.title,
                track_number: self.track.and_then(|t| u32::try_from(t).ok()),
                length: self.length,
                genre: self.genre,
                date: None,
                bit_rate: self.bitrate.and_then(|b| u32::try_from(b).ok()),
                format: self.format,
            },
            year: self.year.unwrap_or(0),
            month: self.month.unwrap_or(0),
            day: self.day.unwrap_or(0),
        }
    }
}

#[async_trait]
impl TagDatabase for BeetsLibrary {
    async fn items_under(&self, root: &Path) -> Result<Vec<TagDatabaseItem>> {
        info!(
            target: "library::scanner",
            library = %self.path.display(),
            root = %root.display(),
            "Reading beets database"
        );

        let rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT path, mb_trackid, mb_albumid, artist, albumartist, album, track,
                   length, genre, year, month, day, title, bitrate, format
            FROM items
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .with_context("reading beets items")?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let path = String::from_utf8_lossy(&row.path).into_owned();
                Path::new(&path).starts_with(root).then(|| row.into_item(path))
            })
            .collect())
    }
}

/// Earliest representable date, used for out-of-range components.
pub fn min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Build a date from raw components, raising zero or negative parts to 1
/// and falling back to [`min_date`] when the result is not a valid date.
pub fn clamp_date(year: i64, month: i64, day: i64) -> NaiveDate {
    let (Ok(year), Ok(month), Ok(day)) = (
        i32::try_from(year.max(1)),
        u32::try_from(month.max(1)),
        u32::try_from(day.max(1)),
    ) else {
        return min_date();
    };
    if year > 9999 {
        return min_date();
    }
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(min_date)
}

/// Enumerate songs from a tag database, keeping recognized formats only.
pub async fn scan_tag_database(
    database: &dyn TagDatabase,
    root: &Path,
    formats: &[String],
    collect_bitrates: bool,
) -> Result<Enumeration> {
    let mut found = Enumeration::default();

    for item in database.items_under(root).await? {
        if !is_audio_file(Path::new(&item.path), formats) {
            continue;
        }
        let mut tags = item.tags;
        tags.date = Some(clamp_date(item.year, item.month, item.day).to_string());
        found.push(SongRecord::from_tags(tags, item.path), collect_bitrates);
    }

    Ok(found)
}
