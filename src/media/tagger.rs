//! Metadata tagging
//!
//! Text fields replace whatever tag the file had. Artwork is best-effort:
//! any failure fetching or embedding it is logged and the text tags stay.

use anyhow::{Context, Result};
use bytes::Bytes;
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::tracks::Track;
use crate::utils::cover_art;
use crate::utils::is_valid_url;

/// Writes title/artist/album and cover art into output files
pub struct Tagger {
    http_client: Client,
    cover_max_size: Option<u32>,
}

impl Tagger {
    pub fn new(cover_max_size: Option<u32>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("tunegrab/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            cover_max_size,
        })
    }

    /// Tag `path` with the track's metadata and the best available artwork
    ///
    /// Returns whether artwork was embedded.
    pub async fn tag(&self, path: &Path, track: &Track, thumbnail: Option<&str>) -> Result<bool> {
        let owned_path = path.to_path_buf();
        let (title, artist, album) = (
            track.title.clone(),
            track.artist.clone(),
            track.album.clone(),
        );
        tokio::task::spawn_blocking(move || write_text_tags(&owned_path, &title, &artist, &album))
            .await
            .context("Tagging task panicked")??;

        let Some(cover_url) = choose_cover_url(&track.cover_art, thumbnail) else {
            debug!("No artwork for {}", track.title);
            return Ok(false);
        };

        match self.add_cover(path, cover_url).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Could not add album art: {:#}", e);
                Ok(false)
            }
        }
    }

    async fn add_cover(&self, path: &Path, url: &str) -> Result<()> {
        let data = self.fetch_cover(url).await?;
        let max_size = self.cover_max_size;
        let path: PathBuf = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let data = match max_size {
                Some(size) => cover_art::process_cover_art(&data, size)?,
                None => data.to_vec(),
            };
            cover_art::embed_cover_art(&path, data)
        })
        .await
        .context("Cover embedding task panicked")?
    }

    async fn fetch_cover(&self, url: &str) -> Result<Bytes> {
        debug!("Fetching cover art: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to fetch cover art")?;

        if !response.status().is_success() {
            anyhow::bail!("Cover art not found (status {})", response.status());
        }

        response
            .bytes()
            .await
            .context("Failed to read cover art response")
    }
}

/// Replace the file's tag with a fresh one carrying title/artist/album
pub fn write_text_tags(path: &Path, title: &str, artist: &str, album: &str) -> Result<()> {
    let tagged_file = Probe::open(path)
        .context("Failed to open audio file")?
        .read()
        .context("Failed to read audio file")?;

    let mut tag = Tag::new(tagged_file.primary_tag_type());
    tag.set_title(title.to_string());
    tag.set_artist(artist.to_string());
    tag.set_album(album.to_string());

    tag.save_to_path(path, WriteOptions::default())
        .context("Failed to write tags")?;

    debug!("Tagged {}", path.display());
    Ok(())
}

/// Streaming-service artwork first, video thumbnail second
pub fn choose_cover_url<'a>(cover_art: &'a str, thumbnail: Option<&'a str>) -> Option<&'a str> {
    if is_valid_url(cover_art) {
        Some(cover_art)
    } else {
        thumbnail.filter(|t| is_valid_url(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_audio::write_silent_mp3;
    use crate::utils::test_server::{Route, TestServer};
    use lofty::picture::PictureType;
    use std::io::Cursor;
    use std::time::Duration;

    fn track(cover_art: &str) -> Track {
        Track {
            title: "AC/DC: Live!".to_string(),
            artist: "Band?".to_string(),
            album: "Live".to_string(),
            cover_art: cover_art.to_string(),
            ..Default::default()
        }
    }

    fn read_tag(path: &Path) -> Tag {
        let tagged = Probe::open(path).unwrap().read().unwrap();
        tagged.primary_tag().cloned().unwrap()
    }

    fn duration(path: &Path) -> Duration {
        Probe::open(path).unwrap().read().unwrap().properties().duration()
    }

    fn front_covers(tag: &Tag) -> Vec<Vec<u8>> {
        tag.pictures()
            .iter()
            .filter(|p| p.pic_type() == PictureType::CoverFront)
            .map(|p| p.data().to_vec())
            .collect()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_choose_cover_url() {
        assert_eq!(
            choose_cover_url("https://i.scdn.co/image/a", Some("https://i.ytimg.com/b.jpg")),
            Some("https://i.scdn.co/image/a")
        );
        assert_eq!(
            choose_cover_url("nan", Some("https://i.ytimg.com/b.jpg")),
            Some("https://i.ytimg.com/b.jpg")
        );
        assert_eq!(choose_cover_url("", Some("garbage")), None);
        assert_eq!(choose_cover_url("", None), None);
    }

    #[test]
    fn test_write_text_tags_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        write_silent_mp3(&path);

        write_text_tags(&path, "Old", "Old Artist", "Old Album").unwrap();
        write_text_tags(&path, "AC/DC: Live!", "Band?", "Live").unwrap();

        let tag = read_tag(&path);
        assert_eq!(tag.title().as_deref(), Some("AC/DC: Live!"));
        assert_eq!(tag.artist().as_deref(), Some("Band?"));
        assert_eq!(tag.album().as_deref(), Some("Live"));
    }

    #[test]
    fn test_embedded_cover_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        write_silent_mp3(&path);
        write_text_tags(&path, "Title", "Artist", "Album").unwrap();

        let cover = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4, 5];
        cover_art::embed_cover_art(&path, cover.clone()).unwrap();
        // Embedding twice keeps a single front cover
        cover_art::embed_cover_art(&path, cover.clone()).unwrap();

        let tag = read_tag(&path);
        let covers: Vec<_> = tag
            .pictures()
            .iter()
            .filter(|p| p.pic_type() == PictureType::CoverFront)
            .collect();
        assert_eq!(covers.len(), 1);
        assert_eq!(covers[0].data(), cover.as_slice());
        assert_eq!(tag.title().as_deref(), Some("Title"));
    }

    #[tokio::test]
    async fn test_unreachable_cover_still_tags_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        write_silent_mp3(&path);

        let tagger = Tagger::new(None).unwrap();
        let embedded = tagger
            .tag(&path, &track("http://127.0.0.1:9/cover.jpg"), None)
            .await
            .unwrap();
        assert!(!embedded);

        let tag = read_tag(&path);
        assert_eq!(tag.title().as_deref(), Some("AC/DC: Live!"));
        assert!(tag.pictures().is_empty());
    }

    #[tokio::test]
    async fn test_no_artwork_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        write_silent_mp3(&path);

        let tagger = Tagger::new(None).unwrap();
        assert!(!tagger.tag(&path, &track(""), None).await.unwrap());
        assert_eq!(read_tag(&path).album().as_deref(), Some("Live"));
    }

    #[tokio::test]
    async fn test_served_cover_is_embedded() {
        let cover = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 9, 8, 7];
        let server =
            TestServer::start(vec![Route::bytes("/cover.jpg", "image/jpeg", cover.clone())]).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        write_silent_mp3(&path);
        let before = duration(&path);

        let tagger = Tagger::new(None).unwrap();
        let embedded = tagger
            .tag(&path, &track(&server.url("/cover.jpg")), None)
            .await
            .unwrap();
        assert!(embedded);
        assert_eq!(server.hits("/cover.jpg"), 1);

        let tag = read_tag(&path);
        assert_eq!(front_covers(&tag), vec![cover]);
        assert_eq!(tag.title().as_deref(), Some("AC/DC: Live!"));

        assert!(before > Duration::ZERO);
        assert_eq!(duration(&path).as_millis(), before.as_millis());
    }

    #[tokio::test]
    async fn test_thumbnail_used_when_cover_missing() {
        let server = TestServer::start(vec![Route::bytes(
            "/thumb.png",
            "image/png",
            png(4, 4),
        )])
        .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        write_silent_mp3(&path);

        let tagger = Tagger::new(None).unwrap();
        let thumbnail = server.url("/thumb.png");
        assert!(tagger.tag(&path, &track("nan"), Some(thumbnail.as_str())).await.unwrap());

        assert_eq!(front_covers(&read_tag(&path)), vec![png(4, 4)]);
    }

    #[tokio::test]
    async fn test_served_cover_is_downscaled() {
        let server = TestServer::start(vec![Route::bytes(
            "/cover.png",
            "image/png",
            png(640, 320),
        )])
        .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        write_silent_mp3(&path);
        let before = duration(&path);

        let tagger = Tagger::new(Some(300)).unwrap();
        assert!(
            tagger
                .tag(&path, &track(&server.url("/cover.png")), None)
                .await
                .unwrap()
        );

        let covers = front_covers(&read_tag(&path));
        assert_eq!(covers.len(), 1);
        let img = image::load_from_memory(&covers[0]).unwrap();
        assert_eq!((img.width(), img.height()), (300, 150));
        assert_eq!(&covers[0][..2], &[0xFF, 0xD8]);
        assert_eq!(duration(&path).as_millis(), before.as_millis());
    }

    #[tokio::test]
    async fn test_missing_cover_path_still_tags_text() {
        let server = TestServer::start(Vec::new()).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        write_silent_mp3(&path);

        let tagger = Tagger::new(None).unwrap();
        let embedded = tagger
            .tag(&path, &track(&server.url("/gone.jpg")), None)
            .await
            .unwrap();
        assert!(!embedded);
        assert!(read_tag(&path).pictures().is_empty());
        assert_eq!(server.hits("/gone.jpg"), 1);
    }
}
