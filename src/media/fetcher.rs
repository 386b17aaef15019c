//! Audio fetching via yt-dlp

use anyhow::{Context, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Format selector: best audio-only stream, else best overall
const FORMAT: &str = "bestaudio/best";

/// What yt-dlp reported about the downloaded item
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    /// Present when the target resolved to a result list
    entries: Option<Vec<VideoInfo>>,
    #[serde(flatten)]
    info: VideoInfo,
}

/// A downloaded source file and its metadata
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    pub path: PathBuf,
    pub info: VideoInfo,
}

/// Downloads audio streams with yt-dlp
pub struct AudioFetcher {
    ytdlp: PathBuf,
    ffmpeg: Option<PathBuf>,
}

impl AudioFetcher {
    /// `ffmpeg`, when given, is passed to yt-dlp for any post-processing it does
    pub fn new(ytdlp: PathBuf, ffmpeg: Option<PathBuf>) -> Self {
        Self { ytdlp, ffmpeg }
    }

    /// Download the best audio for `query` (search text or URL) to `dest`
    pub async fn fetch(&self, query: &str, dest: &Path) -> Result<FetchedAudio> {
        let target = search_target(query);
        let args = build_args(&target, dest, self.ffmpeg.as_deref());
        debug!("Running {} {:?}", self.ytdlp.display(), args);

        let output = Command::new(&self.ytdlp)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ytdlp.display()))?;

        if !output.status.success() {
            anyhow::bail!(
                "yt-dlp failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        if !dest.exists() {
            anyhow::bail!("yt-dlp reported success but {} is missing", dest.display());
        }

        let info = parse_info(&String::from_utf8_lossy(&output.stdout))?;
        info!(
            "Fetched {}",
            info.title.as_deref().unwrap_or(&target)
        );
        debug!(
            "Source: {} ({:.0}s)",
            info.webpage_url.as_deref().unwrap_or("unknown"),
            info.duration.unwrap_or_default()
        );

        Ok(FetchedAudio {
            path: dest.to_path_buf(),
            info,
        })
    }
}

/// Direct links are downloaded as-is; anything else becomes a search
pub fn search_target(query: &str) -> String {
    if query.contains("https://") {
        query.to_string()
    } else {
        format!("ytsearch:{}", query)
    }
}

fn build_args(target: &str, dest: &Path, ffmpeg: Option<&Path>) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-f",
        FORMAT,
        "--no-playlist",
        "--force-overwrites",
        "--no-warnings",
        "--dump-single-json",
        "--no-simulate",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    if let Some(ffmpeg) = ffmpeg {
        args.push("--ffmpeg-location".into());
        args.push(ffmpeg.as_os_str().to_owned());
    }

    args.push("-o".into());
    args.push(dest.as_os_str().to_owned());
    args.push(target.into());
    args
}

/// Parse the info JSON, taking the first entry of a result list
fn parse_info(stdout: &str) -> Result<VideoInfo> {
    let json = stdout
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with('{'))
        .context("yt-dlp printed no info JSON")?;

    let parsed: InfoJson = serde_json::from_str(json).context("Failed to parse yt-dlp output")?;

    match parsed.entries {
        Some(entries) => entries
            .into_iter()
            .next()
            .context("yt-dlp search returned no results"),
        None => Ok(parsed.info),
    }
}
