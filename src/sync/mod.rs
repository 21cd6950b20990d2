//! Library scan reconciliation.
//!
//! [`LibrarySync`] runs one scan pass over a directory (or the tag
//! database entries under it) and reconciles every song against the
//! catalog:
//!
//! 1. Full scans reset `tracks` rows whose file disappeared and drop the
//!    have pool ([`aggregate::prepare_full_scan`])
//! 2. Songs are enumerated and sorted weakest-first so stronger matches
//!    overwrite weaker ones
//! 3. Each song runs through the match [`Cascade`]; hits are written to
//!    both catalog views, misses go to the have pool ([`writer`])
//! 4. Artist aggregates are refreshed and new artists staged or imported
//!
//! Records are processed one at a time. The scan as a whole is not a
//! transaction: an interrupted scan leaves what it wrote so far.
//!
//! # Example
//!
//! ```ignore
//! let options = SyncOptions::from_config(&config, "/music".into(), ScanMode::Full);
//! let summary = LibrarySync::new(pool, options).run().await?;
//! println!("{} matched, {} orphaned", summary.matched(), summary.orphaned);
//! ```

pub mod aggregate;
pub mod progress;
pub mod writer;

use sqlx::sqlite::SqlitePool;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::matching::{Cascade, MatchStrategy, sort_by_specificity};
use crate::metadata::{LoftyTagReader, TagReader};
use crate::resolver::ArtistResolver;
use crate::scanner::beets::{BeetsLibrary, TagDatabase, scan_tag_database};
use crate::scanner::{self, Enumeration, average_bitrate_kbps};
use progress::ProgressReporter;
use writer::Unmatched;

/// Which kind of scan to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// Rescan the whole library
    Full,
    /// Scan one newly added directory belonging to a known artist
    Append { artist_id: String, artist_name: String },
}

impl ScanMode {
    pub fn is_full(&self) -> bool {
        matches!(self, ScanMode::Full)
    }
}

/// Everything a scan needs to know, fixed when the pipeline is built.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub root: PathBuf,
    pub mode: ScanMode,
    /// Recognized file extensions, without the dot
    pub media_formats: Vec<String>,
    /// Tag database to read instead of walking the directory (full scans only)
    pub tag_database: Option<PathBuf>,
    pub detect_bitrate: bool,
    pub auto_import_artists: bool,
    pub trust_tag_database_ids: bool,
}

impl SyncOptions {
    /// Options with default formats and every optional feature off.
    pub fn new(root: impl Into<PathBuf>, mode: ScanMode) -> Self {
        Self::from_config(&Config::default(), root.into(), mode)
    }

    pub fn from_config(config: &Config, root: PathBuf, mode: ScanMode) -> Self {
        let tag_database = if config.tag_database.enabled {
            let path = config.tag_database.library_path();
            if path.is_none() {
                warn!(
                    target: "library::sync",
                    "Tag database enabled but no path configured or found; walking the directory instead"
                );
            }
            path
        } else {
            None
        };

        Self {
            root,
            mode,
            media_formats: config.library.media_formats.clone(),
            tag_database,
            detect_bitrate: config.quality.detect_bitrate,
            auto_import_artists: config.artists.auto_import,
            trust_tag_database_ids: config.tag_database.trust_ids,
        }
    }
}

/// Counts reported at the end of a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    /// Songs enumerated
    pub total: usize,
    pub by_strategy: BTreeMap<MatchStrategy, usize>,
    pub orphaned: usize,
    pub discarded: usize,
    /// Files whose tags could not be read
    pub unreadable: usize,
    pub stale_locations_cleared: usize,
    /// New artists found (full scans only)
    pub new_artists: Vec<String>,
    pub artists_imported: usize,
    /// Average bitrate in kbps, when detection ran on a non-empty sample
    pub detected_bitrate: Option<u32>,
    pub elapsed: Duration,
}

impl ScanSummary {
    pub fn matched(&self) -> usize {
        self.by_strategy.values().sum()
    }
}

/// One scan pass over the catalog.
pub struct LibrarySync {
    pool: SqlitePool,
    options: SyncOptions,
    tag_reader: Arc<dyn TagReader>,
    tag_database: Option<Box<dyn TagDatabase>>,
    resolver: Option<Box<dyn ArtistResolver>>,
}

impl LibrarySync {
    pub fn new(pool: SqlitePool, options: SyncOptions) -> Self {
        Self {
            pool,
            options,
            tag_reader: Arc::new(LoftyTagReader),
            tag_database: None,
            resolver: None,
        }
    }

    /// Replace the tag reader used by directory walks.
    pub fn with_tag_reader(mut self, reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = reader;
        self
    }

    /// Use an already opened tag database instead of `options.tag_database`.
    pub fn with_tag_database(mut self, database: Box<dyn TagDatabase>) -> Self {
        self.tag_database = Some(database);
        self
    }

    /// Resolver used when new artists are auto-imported.
    pub fn with_resolver(mut self, resolver: Box<dyn ArtistResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Run the scan.
    ///
    /// # Errors
    ///
    /// [`Error::SourceUnreadable`] if the root directory or the tag database
    /// is missing; nothing is written in that case. Database errors abort
    /// the scan and leave earlier records applied.
    pub async fn run(&self) -> Result<ScanSummary> {
        let started = Instant::now();
        let root = &self.options.root;

        if !root.is_dir() {
            warn!(target: "library::sync", root = %root.display(), "Cannot find directory. Not scanning");
            return Err(Error::source_unreadable(root));
        }

        // Opened before any cleanup so a missing database writes nothing
        let opened;
        let tag_database: Option<&dyn TagDatabase> = if !self.options.mode.is_full() {
            None
        } else if let Some(database) = &self.tag_database {
            Some(database.as_ref())
        } else if let Some(path) = &self.options.tag_database {
            opened = BeetsLibrary::open(path).await?;
            Some(&opened as &dyn TagDatabase)
        } else {
            None
        };

        let mut summary = ScanSummary::default();

        if self.options.mode.is_full() {
            let cleanup = aggregate::prepare_full_scan(&self.pool).await?;
            summary.stale_locations_cleared = cleanup.stale_locations;
            debug!(target: "library::sync", have_entries = cleanup.have_entries, "Have pool cleared");
        }

        let found = self.enumerate(tag_database).await?;
        let Enumeration {
            mut songs,
            bitrates,
            unreadable,
        } = found;
        summary.total = songs.len();
        summary.unreadable = unreadable;

        info!(
            target: "library::sync",
            "Found {} tracks; matching tracks to the appropriate releases...",
            songs.len()
        );

        sort_by_specificity(&mut songs);

        let cascade = Cascade::new(self.options.trust_tag_database_ids);
        let from_tag_database = tag_database.is_some();
        let mut progress = ProgressReporter::new(songs.len());
        let mut seen_artists = Vec::new();

        for (index, song) in songs.iter().enumerate() {
            let clean_name = song.clean_name();

            match cascade
                .find_match(&self.pool, song, &clean_name, from_tag_database)
                .await?
            {
                Some(outcome) => {
                    debug!(
                        target: "library::sync",
                        location = %song.location,
                        strategy = %outcome.strategy,
                        "Matched"
                    );
                    writer::apply_match(&self.pool, &outcome, song).await?;
                    *summary.by_strategy.entry(outcome.strategy).or_default() += 1;
                }
                None => match writer::record_unmatched(&self.pool, song, &clean_name).await? {
                    Unmatched::Orphaned => {
                        debug!(target: "library::sync", location = %song.location, "No match, added to have pool");
                        summary.orphaned += 1;
                    }
                    Unmatched::Discarded => {
                        debug!(target: "library::sync", location = %song.location, "No match and too little metadata, skipped");
                        summary.discarded += 1;
                    }
                },
            }

            if let Some(artist_name) = &song.artist_name {
                seen_artists.push(artist_name.clone());
            }
            progress.tick(index + 1);
        }

        info!(target: "library::sync", root = %root.display(), "Completed matching tracks from directory");

        match &self.options.mode {
            ScanMode::Full => {
                self.handle_new_artists(seen_artists, &mut summary).await?;
                aggregate::refresh_all(&self.pool).await?;

                if self.options.detect_bitrate {
                    summary.detected_bitrate = average_bitrate_kbps(&bitrates);
                    match summary.detected_bitrate {
                        Some(kbps) => info!(target: "library::sync", kbps, "Detected average bitrate"),
                        None => info!(target: "library::sync", "No bitrates sampled, skipping bitrate detection"),
                    }
                }
            }
            ScanMode::Append {
                artist_id,
                artist_name,
            } => {
                info!(target: "library::sync", artist = %artist_name, "Updating artist track counts");
                aggregate::refresh_artist(&self.pool, artist_id, artist_name).await?;
            }
        }

        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    async fn enumerate(&self, tag_database: Option<&dyn TagDatabase>) -> Result<Enumeration> {
        let collect_bitrates = self.options.detect_bitrate && self.options.mode.is_full();

        if let Some(database) = tag_database {
            return scan_tag_database(
                database,
                &self.options.root,
                &self.options.media_formats,
                collect_bitrates,
            )
            .await;
        }

        let root = self.options.root.clone();
        let formats = self.options.media_formats.clone();
        let reader = Arc::clone(&self.tag_reader);

        tokio::task::spawn_blocking(move || {
            scanner::scan_directory(&root, &formats, reader.as_ref(), collect_bitrates)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))
    }

    /// Stage or import artists seen during the scan that the catalog does
    /// not know yet. The two outcomes are exclusive.
    async fn handle_new_artists(&self, seen: Vec<String>, summary: &mut ScanSummary) -> Result<()> {
        let known = db::list_artists(&self.pool).await?;
        let candidates = aggregate::new_artist_candidates(&aggregate::dedupe_case_insensitive(seen), &known);

        info!(target: "library::sync", "Found {} new artists", candidates.len());
        summary.new_artists = candidates.clone();

        if candidates.is_empty() {
            return Ok(());
        }

        if !self.options.auto_import_artists {
            info!(target: "library::sync", "New artists staged for review");
            db::replace_new_artists(&self.pool, &candidates).await?;
            return Ok(());
        }

        let Some(resolver) = &self.resolver else {
            warn!(target: "library::sync", "Auto-import is on but no resolver is configured; new artists not imported");
            return Ok(());
        };

        info!(target: "library::sync", "Importing {} new artists", candidates.len());
        let resolved = match resolver.resolve(&candidates).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(target: "library::sync", error = %e, "Artist import failed");
                return Ok(());
            }
        };

        for artist in &resolved {
            if db::insert_artist(&self.pool, &artist.artist_id, &artist.artist_name).await? {
                summary.artists_imported += 1;
            }
        }

        for name in candidates
            .iter()
            .filter(|name| !resolved.iter().any(|a| &a.query == *name))
        {
            warn!(target: "library::sync", artist = %name, "Could not resolve new artist");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TagData;
    use crate::model::TrackView;
    use crate::scanner::beets::TagDatabaseItem;
    use crate::test_utils::{
        MockResolver, MockTagDatabase, MockTagReader, catalog_track, count_rows, insert_catalog_track,
        tags, temp_db, touch, tracks_where,
    };

    fn ids_tags(track_id: &str, release_id: &str) -> TagData {
        TagData {
            track_id: Some(track_id.to_string()),
            release_id: Some(release_id.to_string()),
            ..tags()
        }
    }

    fn full_scan(pool: &SqlitePool, root: &std::path::Path, reader: MockTagReader) -> LibrarySync {
        LibrarySync::new(pool.clone(), SyncOptions::new(root, ScanMode::Full)).with_tag_reader(Arc::new(reader))
    }

    async fn have_tracks(pool: &SqlitePool, artist_id: &str) -> i64 {
        db::list_artists(pool)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.artist_id == artist_id)
            .map(|a| a.have_tracks)
            .unwrap()
    }

    #[tokio::test]
    async fn test_dual_id_match_updates_exact_and_hybrid_rows() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let file = touch(&root, "Foo/Bar/01 Baz.mp3");
        insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "a1")).await;

        let reader = MockTagReader::default().with(&file, ids_tags("t1", "r1"));
        let summary = full_scan(&pool, &root, reader).run().await.unwrap();

        assert_eq!(summary.by_strategy.get(&MatchStrategy::Ids), Some(&1));
        assert_eq!(summary.orphaned, 0);

        let location = file.to_string_lossy().into_owned();
        let rows = tracks_where(&pool, TrackView::AllTracks, "t1").await;
        let keys: Vec<_> = rows.iter().map(|r| r.release_id.as_deref()).collect();
        assert_eq!(keys, vec![Some("a1"), Some("r1")]);
        assert!(rows.iter().all(|r| r.location.as_deref() == Some(location.as_str())));
        assert_eq!(tracks_where(&pool, TrackView::Tracks, "t1").await.len(), 2);
        assert_eq!(count_rows(&pool, "have").await, 0);
    }

    #[tokio::test]
    async fn test_rescan_is_idempotent() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let matched = touch(&root, "Foo/Bar/01 Baz.mp3");
        let orphan = touch(&root, "Foo/Demos/01 Sketch.mp3");
        insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "a1")).await;

        let sketch = TagData {
            album: Some("Demos".into()),
            title: Some("Sketch".into()),
            ..tags()
        };

        for _ in 0..2 {
            let reader = MockTagReader::default()
                .with(&matched, ids_tags("t1", "r1"))
                .with(&orphan, sketch.clone());
            full_scan(&pool, &root, reader).run().await.unwrap();
        }

        assert_eq!(count_rows(&pool, "alltracks").await, 2);
        assert_eq!(count_rows(&pool, "tracks").await, 2);
        assert_eq!(count_rows(&pool, "have").await, 1);
    }

    #[tokio::test]
    async fn test_stronger_match_wins_regardless_of_walk_order() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        // "a" sorts before "b" in the walk; the weak file must still lose
        let strong = touch(&root, "a/strong.flac");
        let weak = touch(&root, "b/weak.mp3");
        insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "r1")).await;

        let strong_tags = TagData {
            format: Some("FLAC".into()),
            bit_rate: Some(900_000),
            ..ids_tags("t1", "r1")
        };
        let reader = MockTagReader::default()
            .with(&strong, strong_tags)
            .with(&weak, tags());
        full_scan(&pool, &root, reader).run().await.unwrap();

        let location = strong.to_string_lossy().into_owned();
        let row = &tracks_where(&pool, TrackView::AllTracks, "t1").await[0];
        assert_eq!(row.location.as_deref(), Some(location.as_str()));
        assert_eq!(row.format.as_deref(), Some("FLAC"));
        assert_eq!(row.bit_rate, Some(900_000));
    }

    #[tokio::test]
    async fn test_unmatched_song_becomes_orphan() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let file = touch(&root, "Foo/Bar/Baz.mp3");

        let reader = MockTagReader::default().with(&file, tags());
        let summary = full_scan(&pool, &root, reader).run().await.unwrap();

        assert_eq!(summary.orphaned, 1);
        let have = db::list_have(&pool, None).await.unwrap();
        assert_eq!(have.len(), 1);
        assert_eq!(have[0].clean_name, "foo bar baz");
        assert_eq!(count_rows(&pool, "alltracks").await, 0);
        assert_eq!(count_rows(&pool, "tracks").await, 0);
    }

    #[tokio::test]
    async fn test_song_without_album_is_discarded() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let file = touch(&root, "Foo/Baz.mp3");

        let no_album = TagData { album: None, ..tags() };
        let reader = MockTagReader::default().with(&file, no_album);
        let summary = full_scan(&pool, &root, reader).run().await.unwrap();

        assert_eq!(summary.discarded, 1);
        assert_eq!(count_rows(&pool, "have").await, 0);
        assert_eq!(count_rows(&pool, "alltracks").await, 0);
    }

    #[tokio::test]
    async fn test_missing_root_writes_nothing() {
        let (pool, dir) = temp_db().await;
        db::insert_have(
            &pool,
            &crate::model::HaveEntry {
                artist_name: "Foo".into(),
                album_title: "Bar".into(),
                track_title: "Baz".into(),
                location: "/music/baz.mp3".into(),
                clean_name: "foo bar baz".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let result = full_scan(&pool, &dir.path().join("nowhere"), MockTagReader::default())
            .run()
            .await;

        assert!(matches!(result, Err(Error::SourceUnreadable(_))));
        assert_eq!(count_rows(&pool, "have").await, 1);
    }

    #[tokio::test]
    async fn test_missing_tag_database_aborts_before_cleanup() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        std::fs::create_dir_all(&root).unwrap();

        let mut stale = catalog_track("t1", "r1", "a1");
        stale.location = Some("/gone/baz.mp3".into());
        insert_catalog_track(&pool, TrackView::Tracks, &stale).await;

        let mut options = SyncOptions::new(&root, ScanMode::Full);
        options.tag_database = Some(dir.path().join("beets.db"));
        let result = LibrarySync::new(pool.clone(), options).run().await;

        assert!(result.unwrap_err().is_source_unreadable());
        let row = &tracks_where(&pool, TrackView::Tracks, "t1").await[0];
        assert_eq!(row.location.as_deref(), Some("/gone/baz.mp3"));
    }

    #[tokio::test]
    async fn test_full_scan_clears_stale_locations() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        std::fs::create_dir_all(&root).unwrap();

        let mut stale = catalog_track("t1", "r1", "a1");
        stale.location = Some(root.join("deleted.mp3").to_string_lossy().into_owned());
        insert_catalog_track(&pool, TrackView::Tracks, &stale).await;

        let summary = full_scan(&pool, &root, MockTagReader::default()).run().await.unwrap();

        assert_eq!(summary.stale_locations_cleared, 1);
        assert_eq!(tracks_where(&pool, TrackView::Tracks, "t1").await[0].location, None);
    }

    #[tokio::test]
    async fn test_aggregates_and_staged_new_artists() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let matched = touch(&root, "Foo/Bar/01 Baz.mp3");
        let orphan = touch(&root, "foo/Demos/Sketch.mp3");
        let stranger = touch(&root, "Nico/Chelsea Girl/01.mp3");

        db::insert_artist(&pool, "artist-foo", "Foo").await.unwrap();
        insert_catalog_track(&pool, TrackView::Tracks, &catalog_track("t1", "r1", "r1")).await;

        let reader = MockTagReader::default()
            .with(&matched, ids_tags("t1", "r1"))
            .with(
                &orphan,
                TagData {
                    artist: Some("FOO".into()),
                    album: Some("Demos".into()),
                    title: Some("Sketch".into()),
                    ..tags()
                },
            )
            .with(
                &stranger,
                TagData {
                    artist: Some("Nico".into()),
                    album: Some("Chelsea Girl".into()),
                    title: Some("The Fairest of the Seasons".into()),
                    ..tags()
                },
            );

        let summary = full_scan(&pool, &root, reader).run().await.unwrap();

        assert_eq!(summary.new_artists, vec!["Nico".to_string()]);
        assert_eq!(db::list_new_artists(&pool).await.unwrap(), vec!["Nico".to_string()]);
        assert_eq!(summary.artists_imported, 0);
        assert_eq!(have_tracks(&pool, "artist-foo").await, 2);
    }

    #[tokio::test]
    async fn test_moved_file_updates_exact_and_hybrid_rows() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        insert_catalog_track(&pool, TrackView::Tracks, &catalog_track("t1", "r1", "a1")).await;

        let old = touch(&root, "old/a.mp3");
        let reader = MockTagReader::default().with(&old, ids_tags("t1", "r1"));
        full_scan(&pool, &root, reader).run().await.unwrap();
        std::fs::remove_file(&old).unwrap();

        let new = touch(&root, "new/b.mp3");
        let reader = MockTagReader::default().with(&new, ids_tags("t1", "r1"));
        let summary = full_scan(&pool, &root, reader).run().await.unwrap();
        assert_eq!(summary.by_strategy.get(&MatchStrategy::Ids), Some(&1));

        let location = new.to_string_lossy().into_owned();
        for view in TrackView::ALL {
            let rows = tracks_where(&pool, view, "t1").await;
            let releases: Vec<_> = rows.iter().map(|r| r.release_id.as_deref()).collect();
            assert_eq!(releases, vec![Some("a1"), Some("r1")], "{view:?}");
            for row in &rows {
                assert_eq!(row.location.as_deref(), Some(location.as_str()), "{view:?}");
                assert_eq!(row.album_id.as_deref(), Some("a1"), "{view:?}");
            }
        }
    }

    #[tokio::test]
    async fn test_match_known_only_to_alltracks_counts_for_artist() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let file = touch(&root, "Foo/Bar/01 Baz.mp3");

        db::insert_artist(&pool, "artist-foo", "Foo").await.unwrap();
        insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "r1")).await;

        let reader = MockTagReader::default().with(&file, ids_tags("t1", "r1"));
        full_scan(&pool, &root, reader).run().await.unwrap();

        let selected = tracks_where(&pool, TrackView::Tracks, "t1").await;
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].artist_id.as_deref(), Some("artist-foo"));
        assert_eq!(have_tracks(&pool, "artist-foo").await, 1);
    }

    #[tokio::test]
    async fn test_matched_song_under_unknown_artist_is_new() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let file = touch(&root, "Foo/Bar/01 Baz.mp3");
        insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "r1")).await;

        let reader = MockTagReader::default().with(&file, ids_tags("t1", "r1"));
        let summary = full_scan(&pool, &root, reader).run().await.unwrap();

        assert_eq!(summary.matched(), 1);
        assert_eq!(summary.orphaned, 0);
        assert_eq!(summary.new_artists, vec!["Foo".to_string()]);
        assert_eq!(db::list_new_artists(&pool).await.unwrap(), vec!["Foo".to_string()]);
    }

    #[tokio::test]
    async fn test_auto_import_resolves_instead_of_staging() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let file = touch(&root, "Nico/Chelsea Girl/01.mp3");
        let obscure = touch(&root, "Obscure/Tape/01.mp3");

        let reader = MockTagReader::default()
            .with(
                &file,
                TagData {
                    artist: Some("Nico".into()),
                    ..tags()
                },
            )
            .with(
                &obscure,
                TagData {
                    artist: Some("Obscure".into()),
                    ..tags()
                },
            );
        let resolver = MockResolver {
            unknown: vec!["Obscure".to_string()],
        };
        let mut options = SyncOptions::new(&root, ScanMode::Full);
        options.auto_import_artists = true;

        let summary = LibrarySync::new(pool.clone(), options)
            .with_tag_reader(Arc::new(reader))
            .with_resolver(Box::new(resolver))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.new_artists, vec!["Nico".to_string(), "Obscure".to_string()]);
        assert_eq!(summary.artists_imported, 1);
        // unresolved names are not staged either
        assert!(db::list_new_artists(&pool).await.unwrap().is_empty());
        assert_eq!(db::list_artists(&pool).await.unwrap().len(), 1);
        // imported artists get their counts in the same pass
        assert_eq!(have_tracks(&pool, "mbid-nico").await, 1);
    }

    #[tokio::test]
    async fn test_append_scan_refreshes_one_artist_only() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        let album = root.join("Foo/Bar");
        let file = touch(&album, "01 Baz.mp3");

        db::insert_artist(&pool, "artist-foo", "Foo").await.unwrap();
        db::insert_artist(&pool, "artist-qux", "Qux").await.unwrap();
        insert_catalog_track(&pool, TrackView::Tracks, &catalog_track("t1", "r1", "r1")).await;

        let mut existing = catalog_track("t7", "r7", "r7");
        existing.artist_id = Some("artist-qux".into());
        existing.location = Some("/gone/qux.mp3".into());
        insert_catalog_track(&pool, TrackView::Tracks, &existing).await;

        db::insert_have(
            &pool,
            &crate::model::HaveEntry {
                artist_name: "Someone".into(),
                album_title: "Else".into(),
                track_title: "Entirely".into(),
                location: "/music/else.mp3".into(),
                clean_name: "someone else entirely".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mode = ScanMode::Append {
            artist_id: "artist-foo".into(),
            artist_name: "Foo".into(),
        };
        let mut options = SyncOptions::new(&album, mode);
        // append scans never read the tag database
        options.tag_database = Some(dir.path().join("missing-beets.db"));
        options.detect_bitrate = true;

        let summary = LibrarySync::new(pool.clone(), options)
            .with_tag_reader(Arc::new(MockTagReader::default().with(&file, ids_tags("t1", "r1"))))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.matched(), 1);
        assert!(summary.new_artists.is_empty());
        assert_eq!(summary.detected_bitrate, None);
        assert_eq!(have_tracks(&pool, "artist-foo").await, 1);
        assert_eq!(have_tracks(&pool, "artist-qux").await, 0);
        // no cleanup: stale rows and the have pool survive
        assert_eq!(
            tracks_where(&pool, TrackView::Tracks, "t7").await[0].location.as_deref(),
            Some("/gone/qux.mp3")
        );
        assert_eq!(count_rows(&pool, "have").await, 1);
    }

    #[tokio::test]
    async fn test_tag_database_scan_trusts_ids() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        std::fs::create_dir_all(&root).unwrap();
        insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "a1")).await;

        let item = |path: &str, tags: TagData| TagDatabaseItem {
            path: root.join(path).to_string_lossy().into_owned(),
            tags,
            year: 1999,
            month: 4,
            day: 0,
        };
        let database = MockTagDatabase {
            items: vec![
                item("Foo/Bar/01 Baz.mp3", ids_tags("t1", "r1")),
                // titles would match, but the IDs are trusted
                item("Foo/Bar/01 Baz (copy).mp3", ids_tags("t2", "r2")),
                item("Foo/Bar/cover.jpg", tags()),
            ],
        };

        let mut options = SyncOptions::new(&root, ScanMode::Full);
        options.detect_bitrate = true;
        let summary = LibrarySync::new(pool.clone(), options)
            .with_tag_database(Box::new(database))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.matched(), 1);
        assert_eq!(summary.orphaned, 1);
        assert_eq!(summary.detected_bitrate, Some(320));

        let have = db::list_have(&pool, None).await.unwrap();
        assert_eq!(have[0].date.as_deref(), Some("1999-04-01"));
    }

    #[tokio::test]
    async fn test_untrusted_tag_database_falls_back_to_titles() {
        let (pool, dir) = temp_db().await;
        let root = dir.path().join("music");
        std::fs::create_dir_all(&root).unwrap();
        insert_catalog_track(&pool, TrackView::AllTracks, &catalog_track("t1", "r1", "a1")).await;

        let database = MockTagDatabase {
            items: vec![TagDatabaseItem {
                path: root.join("Foo/Bar/01 Baz.mp3").to_string_lossy().into_owned(),
                tags: ids_tags("t2", "r2"),
                year: 0,
                month: 0,
                day: 0,
            }],
        };

        let mut options = SyncOptions::new(&root, ScanMode::Full);
        options.trust_tag_database_ids = false;
        let summary = LibrarySync::new(pool.clone(), options)
            .with_tag_database(Box::new(database))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.by_strategy.get(&MatchStrategy::Titles), Some(&1));
        assert_eq!(summary.orphaned, 0);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.tag_database.enabled = true;
        config.tag_database.path = Some("/beets/library.db".into());
        config.tag_database.trust_ids = false;
        config.quality.detect_bitrate = true;
        config.artists.auto_import = true;

        let options = SyncOptions::from_config(&config, "/music".into(), ScanMode::Full);
        assert_eq!(options.tag_database, Some(PathBuf::from("/beets/library.db")));
        assert!(options.detect_bitrate);
        assert!(options.auto_import_artists);
        assert!(!options.trust_tag_database_ids);
        assert_eq!(options.media_formats.len(), 8);

        config.tag_database.enabled = false;
        let options = SyncOptions::from_config(&config, "/music".into(), ScanMode::Full);
        assert_eq!(options.tag_database, None);
    }
}
