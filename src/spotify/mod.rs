//! Spotify track sources: Web API client and embed-page scraper

pub mod client;
pub mod link;
pub mod models;
pub mod oauth;
pub mod scraper;
pub mod sources;

use anyhow::Result;
use tracing::{debug, warn};

pub use client::{SpotifyClient, SpotifyCredentials};
pub use link::{LinkError, SpotifyLink};
pub use scraper::EmbedScraper;
pub use sources::{SpotifyApiSource, SpotifyEmbedSource};

use crate::config::Config;
use crate::tracks::{TrackResolver, TrackSource};

/// Build the ranked source list: API first (when credentials exist), scraper last
pub fn build_resolver(
    config: &Config,
    credentials: Option<SpotifyCredentials>,
) -> Result<TrackResolver> {
    let mut sources: Vec<Box<dyn TrackSource>> = Vec::new();

    match credentials {
        Some(creds) => {
            let client = SpotifyClient::new(
                &config.spotify_api_url,
                &config.spotify_accounts_url,
                creds,
            )?;
            sources.push(Box::new(SpotifyApiSource::new(client)));
        }
        None => {
            warn!("No Spotify credentials configured, using the scraper only");
        }
    }

    sources.push(Box::new(SpotifyEmbedSource::new(EmbedScraper::new(
        &config.spotify_embed_url,
    )?)));

    let resolver = TrackResolver::new(sources);
    debug!("Track sources: {:?}", resolver.source_names());
    Ok(resolver)
}
