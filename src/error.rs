//! Application-wide error types.
//!
//! Library modules return [`Result`] with the [`Error`] enum below, while
//! the CLI and `main` use `anyhow` for convenient error propagation.
//!
//! # Taxonomy
//!
//! - [`Error::SourceUnreadable`]: the scan root or tag database is missing.
//!   Fatal for a scan, which aborts before writing anything.
//! - [`Error::Metadata`]: a single file's tags could not be read. The
//!   scanner logs it and skips the file.
//! - Everything else (database, resolver, task) propagates to the caller.
//!
//! # Example
//!
//! ```ignore
//! use library_sync::error::{Error, Result};
//!
//! fn check_root(path: &Path) -> Result<()> {
//!     if !path.is_dir() {
//!         return Err(Error::source_unreadable(path));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Catalog or tag database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Tags of a single file could not be read
    #[error("Cannot read file {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// Scan root or tag database is missing
    #[error("Cannot find {0}")]
    SourceUnreadable(PathBuf),

    /// New-artist resolution failed
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// A blocking task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a source-unreadable error.
    pub fn source_unreadable(path: impl Into<PathBuf>) -> Self {
        Self::SourceUnreadable(path.into())
    }

    /// Create a resolver error.
    pub fn resolver(message: impl Into<String>) -> Self {
        Self::Resolver(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// True when the error means the scan source itself is missing.
    pub fn is_source_unreadable(&self) -> bool {
        match self {
            Self::SourceUnreadable(_) => true,
            Self::WithContext { source, .. } => source.is_source_unreadable(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}
