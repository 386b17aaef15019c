//! Track list persistence (CSV between the resolve and download steps)

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use super::record::Track;

/// Write the track list to `path`
///
/// An empty list writes nothing and returns `false`.
pub fn save_tracks(tracks: &[Track], path: &Path) -> Result<bool> {
    if tracks.is_empty() {
        warn!("No tracks to save");
        return Ok(false);
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create track list {:?}", path))?;

    for track in tracks {
        writer
            .serialize(track)
            .context("Failed to write track row")?;
    }

    writer.flush().context("Failed to flush track list")?;

    info!("Saved {} tracks to {}", tracks.len(), path.display());
    Ok(true)
}

/// Read the track list back, filling blank fields with placeholders
pub fn load_tracks(path: &Path) -> Result<Vec<Track>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open track list {:?}", path))?;

    let mut tracks = Vec::new();
    for (row, record) in reader.deserialize::<Track>().enumerate() {
        let track = record.with_context(|| format!("Invalid track list row {}", row + 1))?;
        tracks.push(track.with_defaults());
    }

    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::record::{UNKNOWN_ALBUM, UNKNOWN_ARTIST};

    #[test]
    fn test_empty_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        assert!(!save_tracks(&[], &path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_then_load_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        let tracks = vec![
            Track {
                title: "Around the World".to_string(),
                artist: "Daft Punk".to_string(),
                album: "Homework".to_string(),
                duration_ms: Some(429_000),
                preview_url: String::new(),
                cover_art: "https://i.scdn.co/image/abc".to_string(),
            },
            Track {
                title: "Windowlicker".to_string(),
                artist: "Aphex Twin".to_string(),
                album: "Windowlicker".to_string(),
                duration_ms: None,
                preview_url: String::new(),
                cover_art: String::new(),
            },
        ];

        assert!(save_tracks(&tracks, &path).unwrap());
        let loaded = load_tracks(&path).unwrap();
        assert_eq!(loaded, tracks);
    }

    #[test]
    fn test_load_fills_blank_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        std::fs::write(
            &path,
            "title,artist,album,duration_ms,preview_url,cover_art\nIntro,,,,,\n",
        )
        .unwrap();

        let loaded = load_tracks(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "Intro");
        assert_eq!(loaded[0].artist, UNKNOWN_ARTIST);
        assert_eq!(loaded[0].album, UNKNOWN_ALBUM);
        assert_eq!(loaded[0].duration_ms, None);
    }
}
