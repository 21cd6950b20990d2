//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\library-sync\config.toml
//! - macOS: ~/Library/Application Support/library-sync/config.toml
//! - Linux: ~/.config/library-sync/config.toml
//!
//! The config file is human-readable and editable. It is read once per
//! command and turned into explicit options for the scan pipeline; the
//! only value written back is the auto-detected preferred bitrate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Media formats recognized when no list is configured.
pub const DEFAULT_MEDIA_FORMATS: &[&str] = &["mp3", "flac", "aac", "ogg", "ape", "m4a", "asf", "wma"];

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library location and scan settings
    pub library: LibraryConfig,

    /// External tag database settings
    pub tag_database: TagDatabaseConfig,

    /// Bitrate detection
    pub quality: QualityConfig,

    /// New-artist handling
    pub artists: ArtistsConfig,
}

/// Library scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root directory scanned when no path is given
    pub music_dir: Option<PathBuf>,

    /// Catalog database file (defaults to `library.db` in the working directory)
    pub database: Option<PathBuf>,

    /// Recognized audio file extensions, without the dot
    pub media_formats: Vec<String>,

    /// Whether scheduled scans are allowed to run
    pub library_scan: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            music_dir: None,
            database: None,
            media_formats: DEFAULT_MEDIA_FORMATS.iter().map(|f| f.to_string()).collect(),
            library_scan: true,
        }
    }
}

/// External tag database (beets library) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagDatabaseConfig {
    /// Read songs from the tag database instead of walking the directory
    pub enabled: bool,

    /// Path to the beets `library.db`
    pub path: Option<PathBuf>,

    /// When a song from the tag database carries both IDs and they match
    /// nothing, report it unmatched without trying the fuzzier strategies
    pub trust_ids: bool,
}

impl Default for TagDatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            trust_ids: true,
        }
    }
}

impl TagDatabaseConfig {
    /// Configured library path, or beets' default location.
    pub fn library_path(&self) -> Option<PathBuf> {
        self.library_path_under(dirs::config_dir())
    }

    fn library_path_under(&self, config_dir: Option<PathBuf>) -> Option<PathBuf> {
        self.path
            .clone()
            .or_else(|| config_dir.map(|d| d.join("beets").join("library.db")))
    }
}

/// Bitrate settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Compute the library's average bitrate after each full scan
    pub detect_bitrate: bool,

    /// Preferred bitrate in kbps
    pub preferred_bitrate: Option<u32>,
}

/// New-artist settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistsConfig {
    /// Import new artists automatically instead of staging them for review
    pub auto_import: bool,

    /// Email or URL sent in the MusicBrainz User-Agent
    pub musicbrainz_contact: Option<String>,
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("library-sync"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file
///
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to a specific file
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
