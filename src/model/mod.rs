//! Core data models for library reconciliation.
//!
//! Defines the ephemeral [`SongRecord`] produced per scanned file and the
//! persistent catalog rows it is reconciled against.
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `artists` - Known artists with their owned-track counts
//! - `alltracks` - Every track across every release of an artist
//! - `tracks` - Tracks of the currently selected release per album
//! - `have` - Owned files that matched no catalog track
//! - `newartists` - Artist names staged for manual review

use sqlx::FromRow;

use crate::matching::clean_name;
use crate::metadata::TagData;

/// One discovered audio file, normalized for matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongRecord {
    /// External recording identifier
    pub track_id: Option<String>,
    /// External release identifier
    pub release_id: Option<String>,
    pub artist_name: Option<String>,
    pub album_title: Option<String>,
    pub track_title: Option<String>,
    pub track_number: Option<u32>,
    /// Length in seconds
    pub track_length: Option<f64>,
    pub genre: Option<String>,
    pub date: Option<String>,
    /// Bits per second
    pub bit_rate: Option<u32>,
    pub format: Option<String>,
    /// File path, unique per scan pass
    pub location: String,
}

impl SongRecord {
    /// Build a record from tag data, preferring the album artist over the
    /// track artist. Blank values are treated as absent.
    pub fn from_tags(tags: TagData, location: impl Into<String>) -> Self {
        let TagData {
            track_id,
            release_id,
            artist,
            album_artist,
            album,
            title,
            track_number,
            length,
            genre,
            date,
            bit_rate,
            format,
        } = tags;

        Self {
            track_id: non_blank(track_id),
            release_id: non_blank(release_id),
            artist_name: non_blank(album_artist).or_else(|| non_blank(artist)),
            album_title: non_blank(album),
            track_title: non_blank(title),
            track_number,
            track_length: length,
            genre: non_blank(genre),
            date: non_blank(date),
            bit_rate: bit_rate.filter(|b| *b > 0),
            format: non_blank(format),
            location: location.into(),
        }
    }

    /// Normalized artist + album + title used for fuzzy matching.
    pub fn clean_name(&self) -> String {
        clean_name(&[
            self.artist_name.as_deref(),
            self.album_title.as_deref(),
            self.track_title.as_deref(),
        ])
    }

    /// Artist, album and title are all present.
    pub fn has_identifying_titles(&self) -> bool {
        self.artist_name.is_some() && self.album_title.is_some() && self.track_title.is_some()
    }

    /// Both external identifiers are present.
    pub fn has_both_ids(&self) -> bool {
        self.track_id.is_some() && self.release_id.is_some()
    }

    /// The fields a match writes onto catalog rows.
    pub fn owned_file(&self) -> OwnedFile {
        OwnedFile {
            location: self.location.clone(),
            bit_rate: self.bit_rate,
            format: self.format.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Local ownership fields set on a matched catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFile {
    pub location: String,
    pub bit_rate: Option<u32>,
    pub format: Option<String>,
}

/// Which of the two catalog track tables a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackView {
    /// Every known track across every release
    AllTracks,
    /// Tracks of the selected release only
    Tracks,
}

impl TrackView {
    /// Lookup order: the superset first, the release-restricted view as fallback.
    pub const ALL: [TrackView; 2] = [TrackView::AllTracks, TrackView::Tracks];

    pub fn table(self) -> &'static str {
        match self {
            TrackView::AllTracks => "alltracks",
            TrackView::Tracks => "tracks",
        }
    }
}

/// A catalog track row, as stored in either view.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct CatalogTrack {
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub album_title: Option<String>,
    /// Owning (canonical) release, used for the hybrid key
    pub album_id: Option<String>,
    pub release_id: Option<String>,
    pub track_title: Option<String>,
    pub track_id: Option<String>,
    pub clean_name: Option<String>,
    /// Null when the track is not owned locally
    pub location: Option<String>,
    pub bit_rate: Option<i64>,
    pub format: Option<String>,
}

/// An owned file that matched nothing in the catalog.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct HaveEntry {
    pub artist_name: String,
    pub album_title: String,
    pub track_number: Option<i64>,
    pub track_title: String,
    pub track_length: Option<f64>,
    pub bit_rate: Option<i64>,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub track_id: Option<String>,
    pub location: String,
    pub clean_name: String,
    pub format: Option<String>,
}

impl HaveEntry {
    /// Build a have entry, or `None` when artist, album or title is missing.
    pub fn from_song(song: &SongRecord, clean_name: &str) -> Option<Self> {
        Some(Self {
            artist_name: song.artist_name.clone()?,
            album_title: song.album_title.clone()?,
            track_number: song.track_number.map(i64::from),
            track_title: song.track_title.clone()?,
            track_length: song.track_length,
            bit_rate: song.bit_rate.map(i64::from),
            genre: song.genre.clone(),
            date: song.date.clone(),
            track_id: song.track_id.clone(),
            location: song.location.clone(),
            clean_name: clean_name.to_string(),
            format: song.format.clone(),
        })
    }
}

/// A known artist and its owned-track aggregate.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Artist {
    pub artist_id: String,
    pub artist_name: String,
    pub have_tracks: i64,
}
