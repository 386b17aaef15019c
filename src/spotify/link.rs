//! Spotify link parsing

use std::fmt;
use thiserror::Error;
use url::Url;

/// A link that cannot be resolved; always fatal to the caller
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Invalid Spotify URL: {0}")]
    InvalidUrl(String),
    #[error("URL must be a playlist or album link (got {0})")]
    UnsupportedKind(String),
}

/// What a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Playlist,
    Album,
}

impl ResourceKind {
    /// Path segment used by the web player and the API
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Playlist => "playlist",
            ResourceKind::Album => "album",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed playlist/album link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyLink {
    pub kind: ResourceKind,
    pub id: String,
    /// The link as given
    pub url: String,
}

impl SpotifyLink {
    /// Parse `https://open.spotify.com/<kind>/<id>` or `spotify:<kind>:<id>`
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let input = input.trim();

        let (kind, id) = if let Some(rest) = input.strip_prefix("spotify:") {
            let mut parts = rest.split(':');
            match (parts.next(), parts.next()) {
                (Some(kind), Some(id)) => (kind.to_string(), id.to_string()),
                _ => return Err(LinkError::InvalidUrl(input.to_string())),
            }
        } else {
            let url = Url::parse(input).map_err(|_| LinkError::InvalidUrl(input.to_string()))?;
            let segments: Vec<&str> = url
                .path_segments()
                .map(|s| s.filter(|seg| !seg.is_empty()).collect())
                .unwrap_or_default();

            // Localized links carry an "intl-xx" segment before the kind
            let segments: Vec<&str> = match segments.first() {
                Some(first) if first.starts_with("intl-") => segments[1..].to_vec(),
                _ => segments,
            };

            if segments.len() < 2 {
                return Err(LinkError::InvalidUrl(input.to_string()));
            }
            (segments[0].to_string(), segments[1].to_string())
        };

        if id.is_empty() {
            return Err(LinkError::InvalidUrl(input.to_string()));
        }

        let kind = match kind.as_str() {
            "playlist" => ResourceKind::Playlist,
            "album" => ResourceKind::Album,
            other => return Err(LinkError::UnsupportedKind(other.to_string())),
        };

        Ok(Self {
            kind,
            id,
            url: input.to_string(),
        })
    }
}
