//! Transcoding via ffmpeg

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::AudioFormat;

/// Allowed drift between source and output duration, in seconds
const DURATION_TOLERANCE: f64 = 2.0;

/// Converts fetched containers to the target format
pub struct Transcoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    format: AudioFormat,
}

impl Transcoder {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf, format: AudioFormat) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            format,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Transcode `source` into `output`, then delete `source`
    ///
    /// The source is removed whatever ffmpeg's outcome; a failed run is
    /// reported as an error.
    pub async fn transcode(&self, source: &Path, output: &Path) -> Result<()> {
        info!("Converting {} -> {}", source.display(), output.display());
        let source_duration = self.probe_duration(source).await;

        let args = build_args(source, output, self.format);
        debug!("Running {} {:?}", self.ffmpeg.display(), args);

        let result = Command::new(&self.ffmpeg).args(&args).output().await;

        if let Err(e) = tokio::fs::remove_file(source).await {
            warn!("Failed to remove {}: {}", source.display(), e);
        }

        let output_status = result.with_context(|| format!("Failed to run {}", self.ffmpeg.display()))?;
        if !output_status.status.success() {
            anyhow::bail!(
                "ffmpeg failed: {}",
                String::from_utf8_lossy(&output_status.stderr).trim()
            );
        }
        if !output.exists() {
            anyhow::bail!("ffmpeg produced no output at {}", output.display());
        }

        if let Some(expected) = source_duration
            && let Some(actual) = self.probe_duration(output).await
            && !durations_match(expected, actual)
        {
            warn!(
                "Duration mismatch for {}: source {:.1}s, output {:.1}s",
                output.display(),
                expected,
                actual
            );
        }

        Ok(())
    }

    /// Duration of a media file in seconds, if ffprobe can tell
    pub async fn probe_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                parse_duration(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                debug!(
                    "ffprobe failed on {}: {}",
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                debug!("Failed to run {}: {}", self.ffprobe.display(), e);
                None
            }
        }
    }
}

fn build_args(source: &Path, output: &Path, format: AudioFormat) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(source.as_os_str().to_owned());
    args.push("-vn".into());
    args.extend(format.codec_args().iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());
    args
}

fn parse_duration(stdout: &str) -> Option<f64> {
    stdout.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}

fn durations_match(expected: f64, actual: f64) -> bool {
    (expected - actual).abs() <= DURATION_TOLERANCE
}
