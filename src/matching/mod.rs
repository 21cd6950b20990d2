//! Match cascade: decides which catalog track a scanned song belongs to.
//!
//! Strategies are tried from most to least reliable and the first hit wins:
//!
//! 1. [`MatchStrategy::Ids`] - recording ID and release ID together
//! 2. [`MatchStrategy::ReleaseIdAndTitle`] - release ID plus exact track title
//! 3. [`MatchStrategy::TrackIdAndAlbumTitle`] - recording ID plus album title (LIKE)
//! 4. [`MatchStrategy::Titles`] - artist, album and track title (LIKE)
//! 5. [`MatchStrategy::CleanName`] - normalized artist + album + title (LIKE)
//! 6. [`MatchStrategy::TrackId`] - recording ID alone
//!
//! Each strategy is a predicate (does the song carry the fields the query
//! needs) paired with an action (which control keys the writer upserts).
//! Strategies 1 and 2 also produce a hybrid key that substitutes the row's
//! owning `album_id` for its `release_id`, keeping the canonical-release
//! row in sync.
//!
//! Upserts are last-write-wins, so songs are processed least specific first
//! (see [`sort_by_specificity`]) and a stronger match for the same file
//! always lands after a weaker one.

use any_ascii::any_ascii;
use sqlx::SqlitePool;

use crate::db;
use crate::model::{CatalogTrack, SongRecord};

// ============================================================================
// Normalization
// ============================================================================

/// Join the present parts with spaces, fold to ASCII, lowercase, strip
/// punctuation and collapse whitespace.
///
/// ```ignore
/// assert_eq!(clean_name(&[Some("AC/DC"), Some("Back in Black"), None]), "acdc back in black");
/// ```
pub fn clean_name(parts: &[Option<&str>]) -> String {
    let joined = parts.iter().flatten().copied().collect::<Vec<_>>().join(" ");
    let folded = any_ascii(&joined).to_lowercase();
    let stripped: String = folded
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape a value for `LIKE ? ESCAPE '\'` so it matches literally,
/// ignoring surrounding whitespace.
pub fn like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Stable sort ascending by (has release ID, has track ID): songs with
/// neither identifier first, songs with both last.
pub fn sort_by_specificity(songs: &mut [SongRecord]) {
    songs.sort_by_key(|s| (s.release_id.is_some(), s.track_id.is_some()));
}

// ============================================================================
// Control keys
// ============================================================================

/// Column set identifying the catalog rows an upsert targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKey {
    /// Exact recording on one release. Also used for the hybrid key, with
    /// the owning album ID in the release column.
    TrackRelease { track_id: String, release_id: String },
    TrackAlbumTitle { track_id: String, album_title: String },
    Titles {
        artist_name: String,
        album_title: String,
        track_title: String,
    },
    CleanName(String),
    TrackId(String),
}

impl ControlKey {
    /// Column name and value pairs, compared with equality.
    pub fn columns(&self) -> Vec<(&'static str, &str)> {
        match self {
            ControlKey::TrackRelease {
                track_id,
                release_id,
            } => vec![("track_id", track_id), ("release_id", release_id)],
            ControlKey::TrackAlbumTitle {
                track_id,
                album_title,
            } => vec![("track_id", track_id), ("album_title", album_title)],
            ControlKey::Titles {
                artist_name,
                album_title,
                track_title,
            } => vec![
                ("artist_name", artist_name),
                ("album_title", album_title),
                ("track_title", track_title),
            ],
            ControlKey::CleanName(clean_name) => vec![("clean_name", clean_name)],
            ControlKey::TrackId(track_id) => vec![("track_id", track_id)],
        }
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// One step of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchStrategy {
    Ids,
    ReleaseIdAndTitle,
    TrackIdAndAlbumTitle,
    Titles,
    CleanName,
    TrackId,
}

/// Strategies in priority order.
pub static CASCADE: [MatchStrategy; 6] = [
    MatchStrategy::Ids,
    MatchStrategy::ReleaseIdAndTitle,
    MatchStrategy::TrackIdAndAlbumTitle,
    MatchStrategy::Titles,
    MatchStrategy::CleanName,
    MatchStrategy::TrackId,
];

/// A catalog query: a `WHERE` clause and its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub filter: &'static str,
    pub params: Vec<String>,
}

impl MatchStrategy {
    pub fn name(self) -> &'static str {
        match self {
            MatchStrategy::Ids => "track id + release id",
            MatchStrategy::ReleaseIdAndTitle => "release id + track title",
            MatchStrategy::TrackIdAndAlbumTitle => "track id + album title",
            MatchStrategy::Titles => "artist + album + track title",
            MatchStrategy::CleanName => "clean name",
            MatchStrategy::TrackId => "track id",
        }
    }

    /// The catalog query for this strategy, or `None` when the song lacks
    /// the fields it needs.
    pub fn lookup(self, song: &SongRecord, clean_name: &str) -> Option<Lookup> {
        let (filter, params) = match self {
            MatchStrategy::Ids => (
                "track_id = ? AND release_id = ?",
                vec![song.track_id.clone()?, song.release_id.clone()?],
            ),
            MatchStrategy::ReleaseIdAndTitle => (
                "release_id = ? AND track_title = ?",
                vec![song.release_id.clone()?, song.track_title.clone()?],
            ),
            MatchStrategy::TrackIdAndAlbumTitle => (
                r"track_id = ? AND TRIM(album_title) LIKE ? ESCAPE '\'",
                vec![
                    song.track_id.clone()?,
                    like_pattern(song.album_title.as_deref()?),
                ],
            ),
            MatchStrategy::Titles => (
                r"TRIM(artist_name) LIKE ? ESCAPE '\' AND TRIM(album_title) LIKE ? ESCAPE '\' AND TRIM(track_title) LIKE ? ESCAPE '\'",
                vec![
                    like_pattern(song.artist_name.as_deref()?),
                    like_pattern(song.album_title.as_deref()?),
                    like_pattern(song.track_title.as_deref()?),
                ],
            ),
            MatchStrategy::CleanName => {
                if !song.has_identifying_titles() || clean_name.is_empty() {
                    return None;
                }
                (
                    r"TRIM(clean_name) LIKE ? ESCAPE '\'",
                    vec![like_pattern(clean_name)],
                )
            }
            MatchStrategy::TrackId => ("track_id = ?", vec![song.track_id.clone()?]),
        };
        Some(Lookup { filter, params })
    }

    /// Keys to upsert, built from the matched row's own values.
    pub fn control_keys(self, row: &CatalogTrack) -> Vec<ControlKey> {
        match self {
            MatchStrategy::Ids | MatchStrategy::ReleaseIdAndTitle => {
                let (Some(track_id), Some(release_id)) = (&row.track_id, &row.release_id) else {
                    return Vec::new();
                };
                let mut keys = vec![ControlKey::TrackRelease {
                    track_id: track_id.clone(),
                    release_id: release_id.clone(),
                }];
                if let Some(album_id) = &row.album_id
                    && album_id != release_id
                {
                    keys.push(ControlKey::TrackRelease {
                        track_id: track_id.clone(),
                        release_id: album_id.clone(),
                    });
                }
                keys
            }
            MatchStrategy::TrackIdAndAlbumTitle => row
                .track_id
                .clone()
                .zip(row.album_title.clone())
                .map(|(track_id, album_title)| ControlKey::TrackAlbumTitle {
                    track_id,
                    album_title,
                })
                .into_iter()
                .collect(),
            MatchStrategy::Titles => {
                let (Some(artist_name), Some(album_title), Some(track_title)) =
                    (&row.artist_name, &row.album_title, &row.track_title)
                else {
                    return Vec::new();
                };
                vec![ControlKey::Titles {
                    artist_name: artist_name.clone(),
                    album_title: album_title.clone(),
                    track_title: track_title.clone(),
                }]
            }
            MatchStrategy::CleanName => row
                .clean_name
                .clone()
                .map(ControlKey::CleanName)
                .into_iter()
                .collect(),
            MatchStrategy::TrackId => row
                .track_id
                .clone()
                .map(ControlKey::TrackId)
                .into_iter()
                .collect(),
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The winning strategy, the catalog row it found and the keys the writer
/// should upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub strategy: MatchStrategy,
    /// Rows created under another key copy their catalog columns from here
    pub row: CatalogTrack,
    pub keys: Vec<ControlKey>,
}

/// Cascade engine with its fallback policy.
#[derive(Debug, Clone, Copy)]
pub struct Cascade {
    /// Skip strategies 2-6 for tag-database songs carrying both IDs
    trust_tag_database_ids: bool,
}

impl Cascade {
    pub fn new(trust_tag_database_ids: bool) -> Self {
        Self {
            trust_tag_database_ids,
        }
    }

    /// Strategies to try for this song, in priority order.
    pub fn strategies(&self, song: &SongRecord, from_tag_database: bool) -> &'static [MatchStrategy] {
        if from_tag_database && self.trust_tag_database_ids && song.has_both_ids() {
            &CASCADE[..1]
        } else {
            &CASCADE
        }
    }

    /// Run the cascade. `Ok(None)` means no strategy matched.
    pub async fn find_match(
        &self,
        pool: &SqlitePool,
        song: &SongRecord,
        clean_name: &str,
        from_tag_database: bool,
    ) -> sqlx::Result<Option<MatchOutcome>> {
        for &strategy in self.strategies(song, from_tag_database) {
            let Some(lookup) = strategy.lookup(song, clean_name) else {
                continue;
            };
            let Some(row) = db::find_track(pool, lookup.filter, &lookup.params).await? else {
                continue;
            };
            let keys = strategy.control_keys(&row);
            if keys.is_empty() {
                continue;
            }
            return Ok(Some(MatchOutcome { strategy, row, keys }));
        }
        Ok(None)
    }
}

impl Default for Cascade {
    fn default() -> Self {
        Self::new(true)
    }
}
