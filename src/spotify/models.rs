//! Spotify Web API response models

use serde::Deserialize;

use crate::tracks::Track;
use crate::tracks::record::join_artists;

/// Accounts service token response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    /// Only sent for the authorization-code grant
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

/// One page of a paged collection
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u32,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleArtist {
    pub name: String,
}

/// Album as embedded in a track object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimpleAlbum {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Full album object (`GET /albums/{id}`)
#[derive(Debug, Clone, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Track object, as found in playlist items and album track pages
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    /// Absent on album track pages
    pub album: Option<SimpleAlbum>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    pub preview_url: Option<String>,
}

/// Playlist entry; `track` is null for removed or local items
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<ApiTrack>,
}

/// First image URL, or empty
pub fn first_image(images: &[Image]) -> String {
    images.first().map(|i| i.url.clone()).unwrap_or_default()
}

impl ApiTrack {
    /// Convert into a track record, taking album name and artwork from the
    /// embedded album unless overridden
    pub fn into_track(self, album_override: Option<(&str, &str)>) -> Track {
        let (album, cover_art) = match album_override {
            Some((name, cover)) => (name.to_string(), cover.to_string()),
            None => {
                let album = self.album.unwrap_or_default();
                let cover = first_image(&album.images);
                (album.name, cover)
            }
        };

        Track {
            title: self.name,
            artist: join_artists(self.artists.iter().map(|a| a.name.as_str())),
            album,
            duration_ms: self.duration_ms,
            preview_url: self.preview_url.unwrap_or_default(),
            cover_art,
        }
    }
}
