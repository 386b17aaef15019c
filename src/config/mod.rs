//! Application configuration
//!
//! Stored in ~/.config/tunegrab/config.json. A missing file means defaults;
//! command-line flags override individual values for a single run.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILE: &str = "config.json";
const APP_DIR: &str = "tunegrab";

/// Target audio format produced by the transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    M4a,
}

impl AudioFormat {
    /// File extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::M4a => "m4a",
        }
    }

    /// ffmpeg codec and quality arguments (fixed per format)
    pub fn codec_args(self) -> &'static [&'static str] {
        match self {
            AudioFormat::Mp3 => &["-codec:a", "libmp3lame", "-q:a", "2", "-f", "mp3"],
            AudioFormat::Opus => &["-codec:a", "libopus", "-b:a", "160k", "-f", "opus"],
            AudioFormat::M4a => &["-codec:a", "aac", "-b:a", "192k", "-f", "ipod"],
        }
    }
}

/// Everything the pipeline components need to know, passed explicitly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local destination used when no portable player is attached
    pub music_dir: PathBuf,
    /// Substring identifying the portable player's volume
    pub device_name: String,
    /// Where provisioned binaries live
    pub tools_dir: PathBuf,
    /// Intermediate track list (CSV)
    pub track_list: PathBuf,
    /// Output audio format
    pub format: AudioFormat,
    /// Downscale embedded artwork to this many pixels (None keeps it as fetched)
    pub cover_max_size: Option<u32>,
    /// Skip tracks whose output file already exists
    pub skip_existing: bool,
    pub spotify_api_url: String,
    pub spotify_accounts_url: String,
    pub spotify_embed_url: String,
    /// Where the browser is sent back to after `auth --login`
    pub spotify_redirect_uri: String,
    /// Per-tool download URL overrides, keyed by tool name
    pub tool_urls: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            music_dir: home.join("Music").join("SpotifyDownloads"),
            device_name: "Mibao-M500".to_string(),
            tools_dir: home.join("ffmpeg-bin"),
            track_list: PathBuf::from("spotify_tracks.csv"),
            format: AudioFormat::default(),
            cover_max_size: None,
            skip_existing: false,
            spotify_api_url: "https://api.spotify.com/v1".to_string(),
            spotify_accounts_url: "https://accounts.spotify.com".to_string(),
            spotify_embed_url: "https://open.spotify.com/embed".to_string(),
            spotify_redirect_uri: "http://127.0.0.1:8000/callback".to_string(),
            tool_urls: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Self =
            serde_json::from_str(&contents).with_context(|| "Failed to parse config")?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
    }
}
