//! Per-track outcomes collected over a run

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::tracks::Track;

/// Pipeline step a track was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Prepare,
    Fetch,
    Transcode,
    Tag,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare",
            Stage::Fetch => "fetch",
            Stage::Transcode => "transcode",
            Stage::Tag => "tag",
        };
        f.write_str(name)
    }
}

/// A track that could not be completed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{stage} failed: {message}")]
pub struct TrackError {
    pub stage: Stage,
    pub message: String,
}

impl TrackError {
    pub fn new(stage: Stage, error: anyhow::Error) -> Self {
        Self {
            stage,
            message: format!("{:#}", error),
        }
    }
}

/// Attach a stage to a fallible step
pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T, TrackError>;
}

impl<T> StageExt<T> for Result<T> {
    fn stage(self, stage: Stage) -> Result<T, TrackError> {
        self.map_err(|e| TrackError::new(stage, e))
    }
}

/// How a track ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TrackStatus {
    Done { path: PathBuf, artwork: bool },
    Skipped { path: PathBuf },
    Failed { stage: Stage, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackOutcome {
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(flatten)]
    pub status: TrackStatus,
}

/// Result of processing a batch of tracks
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub destination: PathBuf,
    pub outcomes: Vec<TrackOutcome>,
}

impl RunReport {
    pub fn new(destination: PathBuf) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            destination,
            outcomes: Vec::new(),
        }
    }

    /// Fold one track's result into the report
    pub fn record(&mut self, track: &Track, result: Result<TrackStatus, TrackError>) {
        let status = result.unwrap_or_else(|e| TrackStatus::Failed {
            stage: e.stage,
            error: e.message,
        });

        self.outcomes.push(TrackOutcome {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            status,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, TrackStatus::Done { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, TrackStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, TrackStatus::Failed { .. }))
    }

    /// Outcomes of failed tracks, in processing order
    pub fn failures(&self) -> impl Iterator<Item = &TrackOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TrackStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&TrackStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    /// Write the report as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        debug!("Wrote report to {}", path.display());
        Ok(())
    }
}
