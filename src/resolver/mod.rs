//! New-artist resolution.
//!
//! After a full scan, artist names seen on disk that are not in the
//! catalog are either staged for review or, with auto-import enabled,
//! handed to an [`ArtistResolver`] that looks them up in an external
//! metadata catalog. Resolved artists are inserted into `artists` by the
//! caller.

mod musicbrainz;

use async_trait::async_trait;

use crate::error::Result;

pub use musicbrainz::MusicBrainzResolver;

/// An artist name resolved to an external identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtist {
    /// Name as it was seen in the scanned files
    pub query: String,
    /// External artist ID, used as the catalog artist ID
    pub artist_id: String,
    /// Canonical name from the metadata catalog
    pub artist_name: String,
}

/// Batched lookup of artist names against an external catalog.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait ArtistResolver: Send + Sync {
    /// Resolve as many names as possible. Names with no confident match
    /// are left out of the result.
    async fn resolve(&self, names: &[String]) -> Result<Vec<ResolvedArtist>>;
}
