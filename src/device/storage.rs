//! Music library layout on the destination (player or local folder)

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::utils::{sanitize_filename, track_file_stem};

/// Extension of the file yt-dlp writes before transcoding
const SOURCE_EXTENSION: &str = "webm";

/// Where one track's files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPaths {
    /// Fetched container, deleted after transcoding
    pub source: PathBuf,
    /// Final tagged file
    pub output: PathBuf,
}

/// Manages the `<root>/<album>/<title - artist>.<ext>` layout
pub struct LibraryStorage {
    root: PathBuf,
    created: HashSet<PathBuf>,
}

impl LibraryStorage {
    /// Create a new storage manager rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            created: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create {}", self.root.display()))?;

        debug!("Initialized library at {}", self.root.display());
        Ok(())
    }

    /// Album folder path, creating it the first time it is asked for
    pub async fn album_dir(&mut self, album: &str) -> Result<PathBuf> {
        let album_path = self.root.join(sanitize_filename(album));

        if self.created.contains(&album_path) {
            return Ok(album_path);
        }

        fs::create_dir_all(&album_path)
            .await
            .context("Failed to create album directory")?;

        debug!("Created album folder: {}", album_path.display());
        self.created.insert(album_path.clone());
        Ok(album_path)
    }

    /// Number of album folders created so far
    pub fn albums_created(&self) -> usize {
        self.created.len()
    }
}

/// Source and output paths for a track inside `dir`
pub fn track_paths(dir: &Path, title: &str, artist: &str, extension: &str) -> TrackPaths {
    let stem = track_file_stem(title, artist);
    TrackPaths {
        source: dir.join(format!("{}.{}", stem, SOURCE_EXTENSION)),
        output: dir.join(format!("{}.{}", stem, extension)),
    }
}
