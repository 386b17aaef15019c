//! Track sources backed by Spotify

use anyhow::Result;
use async_trait::async_trait;

use super::client::SpotifyClient;
use super::link::{ResourceKind, SpotifyLink};
use super::scraper::EmbedScraper;
use crate::tracks::{Track, TrackSource};

/// Authenticated Web API lookup (primary source)
pub struct SpotifyApiSource {
    client: SpotifyClient,
}

impl SpotifyApiSource {
    pub fn new(client: SpotifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TrackSource for SpotifyApiSource {
    fn name(&self) -> &str {
        "Spotify API"
    }

    async fn fetch(&self, link: &SpotifyLink) -> Result<Vec<Track>> {
        match link.kind {
            ResourceKind::Playlist => self.client.playlist_tracks(&link.id).await,
            ResourceKind::Album => self.client.album_tracks(&link.id).await,
        }
    }
}

/// Embed page scraper (fallback source)
pub struct SpotifyEmbedSource {
    scraper: EmbedScraper,
}

impl SpotifyEmbedSource {
    pub fn new(scraper: EmbedScraper) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl TrackSource for SpotifyEmbedSource {
    fn name(&self) -> &str {
        "Spotify embed scraper"
    }

    async fn fetch(&self, link: &SpotifyLink) -> Result<Vec<Track>> {
        self.scraper.tracks(link).await
    }
}
