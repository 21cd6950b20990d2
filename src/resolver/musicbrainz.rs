//! MusicBrainz artist search.
//!
//! See: https://musicbrainz.org/doc/MusicBrainz_API/Search
//!
//! IMPORTANT: MusicBrainz requires a User-Agent header and rate limits to 1 req/sec.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ArtistResolver, ResolvedArtist};
use crate::error::{Error, Result};

/// Application part of the User-Agent - MusicBrainz requires one
const APP_AGENT: &str = concat!("LibrarySync/", env!("CARGO_PKG_VERSION"));

/// User-Agent with the operator's contact appended, as MusicBrainz asks.
fn user_agent(contact: Option<&str>) -> String {
    match contact.map(str::trim).filter(|c| !c.is_empty()) {
        Some(contact) => format!("{APP_AGENT} ( {contact} )"),
        None => APP_AGENT.to_string(),
    }
}

/// Pause between consecutive requests
const REQUEST_INTERVAL: Duration = Duration::from_millis(1100);

/// Lowest search score accepted when the name is not an exact match
const MIN_SCORE: u32 = 95;

/// Artist search response
#[derive(Debug, Clone, Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<ArtistHit>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtistHit {
    id: String,
    name: String,
    #[serde(default)]
    score: u32,
}

/// Resolves artist names through the MusicBrainz search API.
pub struct MusicBrainzResolver {
    http_client: reqwest::Client,
    base_url: String,
}

impl MusicBrainzResolver {
    /// Create a new resolver. `contact` (an email or URL) goes into the
    /// User-Agent.
    pub fn new(contact: Option<&str>) -> Result<Self> {
        Self::with_base_url("https://musicbrainz.org/ws/2", contact)
    }

    /// Create a resolver against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>, contact: Option<&str>) -> Result<Self> {
        if contact.is_none() {
            warn!(target: "library::resolver", "No MusicBrainz contact configured; requests may be throttled");
        }
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent(contact))
            .build()
            .map_err(|e| Error::resolver(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    fn search_url(&self, name: &str) -> String {
        let query = format!("artist:\"{}\"", name.replace('"', "\\\""));
        format!(
            "{}/artist?query={}&fmt=json&limit=5",
            self.base_url,
            urlencoding::encode(&query)
        )
    }

    /// Search one name. `Ok(None)` when nothing matches confidently.
    async fn search(&self, name: &str) -> Result<Option<ResolvedArtist>> {
        let response = self
            .http_client
            .get(self.search_url(name))
            .send()
            .await
            .map_err(|e| Error::resolver(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::resolver("rate limited by MusicBrainz"));
        }

        if !status.is_success() {
            return Err(Error::resolver(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response
            .json::<ArtistSearchResponse>()
            .await
            .map_err(|e| Error::resolver(format!("invalid search response: {e}")))?;

        Ok(pick_artist(name, &body.artists).map(|hit| ResolvedArtist {
            query: name.to_string(),
            artist_id: hit.id.clone(),
            artist_name: hit.name.clone(),
        }))
    }
}

/// Prefer an exact (case-insensitive) name match, otherwise the top hit
/// if it scores high enough.
fn pick_artist<'a>(name: &str, hits: &'a [ArtistHit]) -> Option<&'a ArtistHit> {
    hits.iter()
        .find(|hit| hit.name.to_lowercase() == name.to_lowercase())
        .or_else(|| hits.first().filter(|hit| hit.score >= MIN_SCORE))
}

#[async_trait]
impl ArtistResolver for MusicBrainzResolver {
    async fn resolve(&self, names: &[String]) -> Result<Vec<ResolvedArtist>> {
        let mut resolved = Vec::new();

        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(REQUEST_INTERVAL).await;
            }

            match self.search(name).await {
                Ok(Some(artist)) => {
                    debug!(target: "library::resolver", query = %name, id = %artist.artist_id, "Resolved artist");
                    resolved.push(artist);
                }
                Ok(None) => {
                    info!(target: "library::resolver", query = %name, "No confident MusicBrainz match");
                }
                Err(e) => {
                    warn!(target: "library::resolver", query = %name, error = %e, "Artist lookup failed");
                }
            }
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(name: &str, score: u32) -> ArtistHit {
        ArtistHit {
            id: format!("id-{name}"),
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_resolver_creation() {
        let resolver = MusicBrainzResolver::new(None).unwrap();
        assert_eq!(resolver.base_url, "https://musicbrainz.org/ws/2");
    }

    #[test]
    fn test_user_agent_format() {
        assert!(APP_AGENT.starts_with("LibrarySync/"));
        assert_eq!(user_agent(None), APP_AGENT);
        assert_eq!(user_agent(Some("  ")), APP_AGENT);
        assert_eq!(
            user_agent(Some("me@example.org")),
            format!("{APP_AGENT} ( me@example.org )")
        );
        assert!(!user_agent(None).contains("github.com"));
    }

    #[test]
    fn test_search_url_quotes_name() {
        let resolver = MusicBrainzResolver::with_base_url("http://localhost:8080", None).unwrap();
        let url = resolver.search_url("Sigur Rós");
        assert!(url.starts_with("http://localhost:8080/artist?query=artist%3A%22Sigur%20R"));
        assert!(url.ends_with("&fmt=json&limit=5"));
    }

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "created": "2025-01-01T00:00:00.000Z",
            "count": 2,
            "offset": 0,
            "artists": [
                {"id": "a74b1b7f", "type": "Group", "score": 100, "name": "Portishead", "sort-name": "Portishead"},
                {"id": "0f0c9f1e", "score": 61, "name": "Portishead Tribute"}
            ]
        }"#;
        let response: ArtistSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.artists.len(), 2);
        assert_eq!(response.artists[0].score, 100);
    }

    #[test]
    fn test_pick_prefers_exact_name() {
        let hits = vec![hit("The Band", 100), hit("Band", 98)];
        assert_eq!(pick_artist("band", &hits).unwrap().name, "Band");
    }

    #[test]
    fn test_pick_requires_high_score_otherwise() {
        assert_eq!(pick_artist("Foo", &[hit("Fooo", 96)]).unwrap().name, "Fooo");
        assert!(pick_artist("Foo", &[hit("Bar", 80)]).is_none());
        assert!(pick_artist("Foo", &[]).is_none());
    }
}
