//! Audio file metadata reading.
//!
//! Uses the lofty crate for format-independent metadata access. The
//! [`TagReader`] trait is the seam the scanner reads through, so the
//! pipeline can be driven by fixtures in tests.
//!
//! # Fields
//! - MusicBrainz recording and release IDs (`track_id`, `release_id`)
//! - Artist, album artist, album, title, track number, genre, date
//! - Length, average bitrate and container format from the audio properties

use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use std::path::Path;

use crate::error::{Error, Result};

/// Tag fields read from one audio file.
///
/// Every field is optional: files in the wild carry anything from a full
/// MusicBrainz tag set to nothing at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagData {
    /// MusicBrainz recording ID
    pub track_id: Option<String>,
    /// MusicBrainz release ID
    pub release_id: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub track_number: Option<u32>,
    /// Length in seconds
    pub length: Option<f64>,
    pub genre: Option<String>,
    pub date: Option<String>,
    /// Average bitrate in bits per second
    pub bit_rate: Option<u32>,
    /// Container format name, e.g. "MP3" or "FLAC"
    pub format: Option<String>,
}

/// Reads tag metadata from a file on disk.
///
/// Implement this trait to substitute fixtures in tests.
pub trait TagReader: Send + Sync {
    /// Read the tags of one file. Fails with [`Error::Metadata`] when the
    /// file cannot be parsed.
    fn read(&self, path: &Path) -> Result<TagData>;
}

/// Production tag reader backed by lofty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<TagData> {
        read(path)
    }
}

pub fn read(path: &Path) -> Result<TagData> {
    // Probe the file to determine format and read tags
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("failed to open file for probing: {e}")))?
        .read()
        .map_err(|e| Error::metadata(path, format!("failed to read file metadata: {e}")))?;

    // Get the primary tag, or fall back to the first available tag
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let text = |key: &ItemKey| tag.and_then(|t| t.get_string(key)).map(str::to_string);

    let date = text(&ItemKey::RecordingDate)
        .or_else(|| tag.and_then(|t| t.year()).map(|y| y.to_string()));

    let properties = tagged_file.properties();
    let duration = properties.duration();
    let length = (!duration.is_zero()).then(|| duration.as_secs_f64());
    let bit_rate = properties
        .audio_bitrate()
        .or_else(|| properties.overall_bitrate())
        .map(|kbps| kbps * 1000);

    Ok(TagData {
        track_id: text(&ItemKey::MusicBrainzRecordingId),
        release_id: text(&ItemKey::MusicBrainzReleaseId),
        artist: tag.and_then(|t| t.artist().map(|s| s.to_string())),
        album_artist: text(&ItemKey::AlbumArtist),
        album: tag.and_then(|t| t.album().map(|s| s.to_string())),
        title: tag.and_then(|t| t.title().map(|s| s.to_string())),
        track_number: tag.and_then(|t| t.track()),
        length,
        genre: tag.and_then(|t| t.genre().map(|s| s.to_string())),
        date,
        bit_rate,
        format: Some(format_name(tagged_file.file_type()).to_string()),
    })
}

/// Human-readable container name, following the names beets stores.
pub fn format_name(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Mpeg => "MP3",
        FileType::Flac => "FLAC",
        FileType::Aac => "AAC",
        FileType::Mp4 => "AAC",
        FileType::Vorbis => "OGG",
        FileType::Opus => "Opus",
        FileType::Speex => "Speex",
        FileType::Wav => "WAV",
        FileType::Aiff => "AIFF",
        FileType::Ape => "APE",
        FileType::WavPack => "WavPack",
        FileType::Mpc => "Musepack",
        _ => "Unknown",
    }
}
