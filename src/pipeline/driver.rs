//! Sequential per-track pipeline: fetch, transcode, tag
//!
//! Tracks run strictly one after another. A failing track is recorded in
//! the report and the run moves on to the next one.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::report::{RunReport, Stage, StageExt, TrackError, TrackStatus};
use crate::config::Config;
use crate::device::{LibraryStorage, track_paths};
use crate::media::{AudioFetcher, FetchedAudio, Tagger, Transcoder};
use crate::tools::ToolPaths;
use crate::tracks::Track;

/// Runs tracks through the media steps into a library folder
pub struct PipelineDriver {
    fetcher: AudioFetcher,
    transcoder: Transcoder,
    tagger: Tagger,
    storage: LibraryStorage,
    skip_existing: bool,
}

impl PipelineDriver {
    pub fn new(
        fetcher: AudioFetcher,
        transcoder: Transcoder,
        tagger: Tagger,
        storage: LibraryStorage,
        skip_existing: bool,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            tagger,
            storage,
            skip_existing,
        }
    }

    /// Wire up the media steps from configuration and provisioned tools
    pub fn from_config(config: &Config, tools: &ToolPaths, destination: PathBuf) -> Result<Self> {
        Ok(Self::new(
            AudioFetcher::new(tools.ytdlp.clone(), Some(tools.ffmpeg.clone())),
            Transcoder::new(tools.ffmpeg.clone(), tools.ffprobe.clone(), config.format),
            Tagger::new(config.cover_max_size)?,
            LibraryStorage::new(destination),
            config.skip_existing,
        ))
    }

    pub fn destination(&self) -> &Path {
        self.storage.root()
    }

    /// Process every track into its album folder
    pub async fn run(&mut self, tracks: &[Track]) -> Result<RunReport> {
        self.storage.init().await?;
        let mut report = RunReport::new(self.storage.root().to_path_buf());

        let progress = ProgressBar::new(tracks.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );

        for track in tracks {
            progress.set_message(track.title.clone());
            let result = self.process_in_album(track).await;
            if let Err(e) = &result {
                progress.suspend(|| error!("{} - {}: {}", track.title, track.artist, e));
            }
            report.record(track, result);
            progress.inc(1);
        }

        progress.finish_with_message("Done");
        debug!("Created {} album folders", self.storage.albums_created());
        report.finish();
        Ok(report)
    }

    /// Process a single track found by `query`, into its album folder or the library root
    ///
    /// A track with a blank title is named after the video once fetched.
    pub async fn run_single(
        &mut self,
        track: &Track,
        query: &str,
        in_album: bool,
    ) -> Result<RunReport> {
        self.storage.init().await?;
        let mut report = RunReport::new(self.storage.root().to_path_buf());

        let (recorded, result) = match self.single_dir(track, in_album).await {
            Err(e) => (track.clone(), Err(e)),
            Ok(dir) if track.title.trim().is_empty() => {
                match self.process_untitled(track, query, &dir).await {
                    Ok((named, status)) => (named, Ok(status)),
                    Err(e) => (
                        Track {
                            title: query.to_string(),
                            ..track.clone()
                        },
                        Err(e),
                    ),
                }
            }
            Ok(dir) => (track.clone(), self.process(track, query, &dir).await),
        };
        report.record(&recorded, result);

        report.finish();
        Ok(report)
    }

    async fn single_dir(&mut self, track: &Track, in_album: bool) -> Result<PathBuf, TrackError> {
        if in_album {
            self.storage.album_dir(&track.album).await.stage(Stage::Prepare)
        } else {
            Ok(self.storage.root().to_path_buf())
        }
    }

    async fn process_in_album(&mut self, track: &Track) -> Result<TrackStatus, TrackError> {
        let dir = self.storage.album_dir(&track.album).await.stage(Stage::Prepare)?;
        self.process(track, &track.search_query(), &dir).await
    }

    /// Fetch, transcode and tag one track into `dir`
    pub async fn process(
        &self,
        track: &Track,
        query: &str,
        dir: &Path,
    ) -> Result<TrackStatus, TrackError> {
        let paths = track_paths(
            dir,
            &track.title,
            &track.artist,
            self.transcoder.format().extension(),
        );

        if self.skip_existing && paths.output.exists() {
            info!("Already downloaded: {}", paths.output.display());
            return Ok(TrackStatus::Skipped { path: paths.output });
        }

        let fetched = self
            .fetcher
            .fetch(query, &paths.source)
            .await
            .stage(Stage::Fetch)?;

        self.convert(track, &fetched, paths.output).await
    }

    /// Fetch first, then name and tag the track after the video's title
    async fn process_untitled(
        &self,
        track: &Track,
        query: &str,
        dir: &Path,
    ) -> Result<(Track, TrackStatus), TrackError> {
        let extension = self.transcoder.format().extension();
        let staging = track_paths(dir, query, &track.artist, extension).source;

        let fetched = self
            .fetcher
            .fetch(query, &staging)
            .await
            .stage(Stage::Fetch)?;

        let named = Track {
            title: fetched.info.title.clone().unwrap_or_default(),
            ..track.clone()
        }
        .with_defaults();
        let paths = track_paths(dir, &named.title, &named.artist, extension);

        if self.skip_existing && paths.output.exists() {
            info!("Already downloaded: {}", paths.output.display());
            if let Err(e) = tokio::fs::remove_file(&fetched.path).await {
                warn!("Failed to remove {}: {}", fetched.path.display(), e);
            }
            return Ok((named, TrackStatus::Skipped { path: paths.output }));
        }

        let status = self.convert(&named, &fetched, paths.output).await?;
        Ok((named, status))
    }

    /// Transcode a fetched source into `output` and tag it
    async fn convert(
        &self,
        track: &Track,
        fetched: &FetchedAudio,
        output: PathBuf,
    ) -> Result<TrackStatus, TrackError> {
        self.transcoder
            .transcode(&fetched.path, &output)
            .await
            .stage(Stage::Transcode)?;

        let artwork = self
            .tagger
            .tag(&output, track, fetched.info.thumbnail.as_deref())
            .await
            .stage(Stage::Tag)?;

        info!("Downloaded + tagged: {}", output.display());
        Ok(TrackStatus::Done {
            path: output,
            artwork,
        })
    }
}
