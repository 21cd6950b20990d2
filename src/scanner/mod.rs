//! Song source enumeration.
//!
//! Two sources produce [`SongRecord`]s for the matcher:
//! - [`scan_directory`] walks a directory tree and reads each recognized
//!   audio file through a [`TagReader`]
//! - [`beets::scan_tag_database`] queries an external tag database for the
//!   items stored under the scan root
//!
//! Both optionally sample bitrates for average-bitrate detection.

pub mod beets;

use std::path::Path;
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::metadata::TagReader;
use crate::model::SongRecord;

/// Songs produced by one source, plus what was collected along the way.
#[derive(Debug, Default)]
pub struct Enumeration {
    pub songs: Vec<SongRecord>,
    /// Bitrates (bps) of every song that had one, when sampling is on
    pub bitrates: Vec<u32>,
    /// Files whose tags could not be read
    pub unreadable: usize,
}

impl Enumeration {
    fn push(&mut self, song: SongRecord, collect_bitrates: bool) {
        if collect_bitrates && let Some(bit_rate) = song.bit_rate {
            self.bitrates.push(bit_rate);
        }
        self.songs.push(song);
    }
}

/// True if the file extension is one of `formats` (case-insensitive).
pub fn is_audio_file(path: &Path, formats: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| formats.iter().any(|f| f.eq_ignore_ascii_case(ext)))
}

/// Directories below the root whose name starts with a dot.
fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Walk `root` recursively in file-name order, skipping hidden subtrees,
/// and read the tags of every file with a recognized extension.
///
/// Files the reader cannot parse are logged and skipped.
pub fn scan_directory(
    root: &Path,
    formats: &[String],
    reader: &dyn TagReader,
    collect_bitrates: bool,
) -> Enumeration {
    info!(target: "library::scanner", root = %root.display(), "Scanning music directory");

    let mut found = Enumeration::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: "library::scanner", error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !is_audio_file(path, formats) {
            continue;
        }

        match reader.read(path) {
            Ok(tags) => found.push(SongRecord::from_tags(tags, path.to_string_lossy()), collect_bitrates),
            Err(e) => {
                error!(target: "library::scanner", path = %path.display(), error = %e, "Cannot read file");
                found.unreadable += 1;
            }
        }
    }

    found
}

/// Average of the sampled bitrates in kbps, or `None` for an empty sample.
pub fn average_bitrate_kbps(bitrates: &[u32]) -> Option<u32> {
    if bitrates.is_empty() {
        return None;
    }
    let total: u64 = bitrates.iter().map(|&b| u64::from(b)).sum();
    u32::try_from(total / bitrates.len() as u64 / 1000).ok()
}
