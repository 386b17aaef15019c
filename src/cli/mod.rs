//! CLI module for tunegrab

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

use crate::config::{AudioFormat, Config};

#[derive(Parser, Debug)]
#[command(name = "tunegrab", about = "Download Spotify playlists and albums as tagged audio files")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Spotify application credentials (falls back to the keyring)
#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Spotify client ID
    #[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Spotify client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
}

/// Per-run overrides of the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Local music folder used when the player is not attached
    #[arg(long, value_name = "DIR")]
    pub music_dir: Option<PathBuf>,

    /// Name (or part of the label) of the portable player
    #[arg(long)]
    pub device: Option<String>,

    /// Output audio format
    #[arg(long, value_enum)]
    pub format: Option<AudioFormat>,

    /// Skip tracks whose output file already exists
    #[arg(long)]
    pub skip_existing: bool,

    /// Write a JSON report of the run to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl OutputArgs {
    /// Fold these overrides into a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.music_dir {
            config.music_dir = dir.clone();
        }
        if let Some(device) = &self.device {
            config.device_name = device.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.skip_existing {
            config.skip_existing = true;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store Spotify API credentials in the system keyring
    Auth {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Remove stored credentials instead
        #[arg(long)]
        clear: bool,

        /// Also log in as a Spotify user in the browser, so private and
        /// collaborative playlists can be read
        #[arg(long, conflicts_with = "clear")]
        login: bool,
    },

    /// Fetch a playlist or album's track list and save it as CSV
    Fetch {
        /// Spotify playlist or album URL
        url: String,

        /// Track list file (defaults to the configured one)
        #[arg(long, value_name = "CSV")]
        tracks: Option<PathBuf>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Download every track of a saved track list
    Download {
        /// Track list file (defaults to the configured one)
        #[arg(long, value_name = "CSV")]
        tracks: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fetch a playlist or album and download all of it
    Run {
        /// Spotify playlist or album URL
        url: String,

        /// Track list file (defaults to the configured one)
        #[arg(long, value_name = "CSV")]
        tracks: Option<PathBuf>,

        #[command(flatten)]
        credentials: CredentialArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Download a single song by search text or video URL
    Track {
        /// Search text or direct video URL
        query: String,

        /// Title tag (defaults to the title of the video found)
        #[arg(long)]
        title: Option<String>,

        /// Artist tag
        #[arg(long)]
        artist: Option<String>,

        /// Album tag; also puts the file in an album folder
        #[arg(long)]
        album: Option<String>,

        /// Artwork URL to embed (defaults to the video thumbnail)
        #[arg(long)]
        cover: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Download missing tools and show where each one lives
    Tools,

    /// List detected removable devices
    Devices,

    /// Show the configuration
    Config {
        /// Write the current configuration (defaults if none) to disk
        #[arg(long)]
        init: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
