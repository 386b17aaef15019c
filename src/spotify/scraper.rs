//! Fallback scraper for the public embed player
//!
//! The embed page ships its state as a `__NEXT_DATA__` JSON blob, which
//! includes the track list without needing any credentials.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::link::{ResourceKind, SpotifyLink};
use crate::tracks::Track;

const NEXT_DATA_MARKER: &str = r#"<script id="__NEXT_DATA__" type="application/json">"#;

/// HTTP scraper for open.spotify.com/embed pages
pub struct EmbedScraper {
    embed_url: String,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
struct NextData {
    props: Props,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Props {
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    state: EmbedState,
}

#[derive(Debug, Deserialize)]
struct EmbedState {
    data: EmbedData,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    entity: Entity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entity {
    #[serde(default)]
    name: String,
    cover_art: Option<CoverArt>,
    #[serde(default)]
    track_list: Vec<EmbedTrack>,
}

#[derive(Debug, Deserialize)]
struct CoverArt {
    #[serde(default)]
    sources: Vec<ImageSource>,
}

#[derive(Debug, Deserialize)]
struct ImageSource {
    url: String,
    #[serde(default)]
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbedTrack {
    #[serde(default)]
    title: String,
    /// Comma-separated artist names
    #[serde(default)]
    subtitle: String,
    #[serde(default)]
    duration: Option<u64>,
    audio_preview: Option<AudioPreview>,
}

#[derive(Debug, Deserialize)]
struct AudioPreview {
    url: String,
}

impl EmbedScraper {
    pub fn new(embed_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            embed_url: embed_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Scrape the tracks behind a link
    pub async fn tracks(&self, link: &SpotifyLink) -> Result<Vec<Track>> {
        let url = format!("{}/{}/{}", self.embed_url, link.kind, link.id);
        debug!("Scraping embed page: {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch embed page")?;

        if !response.status().is_success() {
            anyhow::bail!("Embed page returned status {}", response.status());
        }

        let html = response.text().await.context("Failed to read embed page")?;
        parse_embed_page(&html, link.kind)
    }
}

/// Extract track records from an embed page
fn parse_embed_page(html: &str, kind: ResourceKind) -> Result<Vec<Track>> {
    let start = html
        .find(NEXT_DATA_MARKER)
        .map(|i| i + NEXT_DATA_MARKER.len())
        .context("Embed page has no __NEXT_DATA__ block")?;
    let end = html[start..]
        .find("</script>")
        .map(|i| start + i)
        .context("Unterminated __NEXT_DATA__ block")?;

    let data: NextData =
        serde_json::from_str(&html[start..end]).context("Failed to parse embed page data")?;
    let entity = data.props.page_props.state.data.entity;

    // Playlist embeds carry no per-track album or artwork
    let (album, cover_art) = match kind {
        ResourceKind::Album => {
            let cover = entity
                .cover_art
                .as_ref()
                .and_then(|c| c.sources.iter().max_by_key(|s| s.width.unwrap_or(0)))
                .map(|s| s.url.clone())
                .unwrap_or_default();
            (entity.name.clone(), cover)
        }
        ResourceKind::Playlist => (String::new(), String::new()),
    };

    let tracks = entity
        .track_list
        .into_iter()
        .map(|t| Track {
            title: t.title,
            artist: t.subtitle.replace('\u{a0}', " "),
            album: album.clone(),
            duration_ms: t.duration,
            preview_url: t.audio_preview.map(|p| p.url).unwrap_or_default(),
            cover_art: cover_art.clone(),
        })
        .collect();

    Ok(tracks)
}
