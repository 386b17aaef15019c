//! Normalized track record

use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// One song, independent of where its metadata came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    /// Artist names joined with ", "
    pub artist: String,
    pub album: String,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub preview_url: String,
    /// Streaming-service artwork URL (may be empty)
    #[serde(default)]
    pub cover_art: String,
}

impl Track {
    /// Replace blank title/artist/album with placeholders
    pub fn with_defaults(mut self) -> Self {
        fill_blank(&mut self.title, UNKNOWN_TITLE);
        fill_blank(&mut self.artist, UNKNOWN_ARTIST);
        fill_blank(&mut self.album, UNKNOWN_ALBUM);
        self
    }

    /// Search query used to find this track on the video platform
    pub fn search_query(&self) -> String {
        format!("{} {} audio", self.title, self.artist)
    }
}

fn fill_blank(field: &mut String, placeholder: &str) {
    if field.trim().is_empty() || field.trim().eq_ignore_ascii_case("nan") {
        *field = placeholder.to_string();
    }
}

/// Join artist names the way every source presents them
pub fn join_artists<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().collect::<Vec<_>>().join(", ")
}
