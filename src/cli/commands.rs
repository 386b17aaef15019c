//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};

use super::{AuthManager, CredentialArgs, OutputArgs};
use crate::config::Config;
use crate::device::{DeviceDetector, resolve_destination};
use crate::pipeline::{PipelineDriver, RunReport, TrackStatus};
use crate::spotify::build_resolver;
use crate::tools::{Tool, ToolPaths, ToolProvisioner};
use crate::tracks::{Track, load_tracks, save_tracks};

/// Handle the `auth` command
pub async fn auth(credentials: CredentialArgs, clear: bool, login: bool) -> Result<()> {
    if clear {
        AuthManager::clear()?;
        println!("{}", "Stored Spotify credentials removed.".green());
        return Ok(());
    }

    let config = Config::load()?;
    let creds = if login {
        println!("{}", "Logging in to Spotify...".cyan());
        AuthManager::login(credentials.client_id, credentials.client_secret, &config).await?
    } else {
        println!("{}", "Configuring Spotify API credentials...".cyan());
        AuthManager::authenticate(credentials.client_id, credentials.client_secret, &config)
            .await?
    };

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!("  Client ID: {}", creds.client_id);
    if creds.refresh_token.is_some() {
        println!("  Private and collaborative playlists are readable.");
    }
    println!();
    println!("Credentials stored securely in system keyring.");

    Ok(())
}

/// Handle the `fetch` command
pub async fn fetch(url: String, tracks: Option<PathBuf>, credentials: CredentialArgs) -> Result<()> {
    let config = Config::load()?;
    let list_path = tracks.unwrap_or_else(|| config.track_list.clone());

    let fetched = fetch_tracks(&config, &url, credentials).await?;
    persist_tracks(&fetched, &list_path)?;

    Ok(())
}

/// Handle the `download` command
pub async fn download(tracks: Option<PathBuf>, output: OutputArgs) -> Result<()> {
    let mut config = Config::load()?;
    output.apply(&mut config);
    let list_path = tracks.unwrap_or_else(|| config.track_list.clone());

    download_list(&config, &list_path, output.report.as_deref()).await
}

/// Handle the `run` command: fetch the track list, then download it
pub async fn run(
    url: String,
    tracks: Option<PathBuf>,
    credentials: CredentialArgs,
    output: OutputArgs,
) -> Result<()> {
    let mut config = Config::load()?;
    output.apply(&mut config);
    let list_path = tracks.unwrap_or_else(|| config.track_list.clone());

    let fetched = fetch_tracks(&config, &url, credentials).await?;
    if !persist_tracks(&fetched, &list_path)? {
        return Ok(());
    }

    println!();
    download_list(&config, &list_path, output.report.as_deref()).await
}

/// Handle the `track` command: one song by search text or URL
pub async fn track(
    query: String,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    cover: Option<String>,
    output: OutputArgs,
) -> Result<()> {
    let mut config = Config::load()?;
    output.apply(&mut config);

    let track = single_track(title, artist, album.clone(), cover);

    let tools = provision_tools(&config).await?;
    let destination = resolve_destination(&config.device_name, config.music_dir.clone()).await;
    let mut driver = PipelineDriver::from_config(&config, &tools, destination)?;

    println!(
        "{} {} to {}",
        "Downloading".cyan(),
        query,
        driver.destination().display()
    );
    let report = driver.run_single(&track, &query, album.is_some()).await?;

    print_report(&report);
    finish_report(&report, output.report.as_deref())
}

/// Track for the single-song flow; without `--title` the title stays blank
/// so the driver names it after the video it finds
fn single_track(
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    cover: Option<String>,
) -> Track {
    let mut track = Track {
        title: String::new(),
        artist: artist.unwrap_or_default(),
        album: album.unwrap_or_default(),
        cover_art: cover.unwrap_or_default(),
        ..Default::default()
    }
    .with_defaults();
    track.title = title.unwrap_or_default();
    track
}

/// Handle the `tools` command
pub async fn tools() -> Result<()> {
    let config = Config::load()?;
    let provisioner = ToolProvisioner::from_config(&config)?;

    println!("{}", "Checking tools...".cyan());
    println!("  Directory: {}", config.tools_dir.display());
    println!();

    for tool in Tool::ALL {
        match provisioner.ensure(tool).await {
            Ok(Some(path)) => {
                println!("  {} {:<8} {}", "✓".green(), tool.name(), path.display());
            }
            Ok(None) => {
                println!(
                    "  {} {:<8} {}",
                    "!".yellow(),
                    tool.name(),
                    "not provisioned, using PATH".dimmed()
                );
            }
            Err(e) => {
                println!("  {} {:<8} {:#}", "✗".red(), tool.name(), e);
            }
        }
    }

    Ok(())
}

/// Handle the `devices` command
pub async fn devices() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Scanning for devices...".cyan());
    println!();

    let devices = tokio::task::spawn_blocking(DeviceDetector::scan)
        .await
        .context("Device scan task panicked")??;

    if devices.is_empty() {
        println!("{}", "No removable devices found.".yellow());
        println!(
            "Music will be saved to {}",
            config.music_dir.display().to_string().bold()
        );
        return Ok(());
    }

    println!("{}", "Removable devices:".green().bold());
    for device in &devices {
        let marker = if device.matches(&config.device_name) {
            format!(" {}", "(player)".green())
        } else {
            String::new()
        };

        println!("  {}{}", device.display_name().bold(), marker);
        println!("    Mount: {}", device.mount_point.display());
        if !device.fs_type.is_empty() {
            println!("    Type:  {}", device.fs_type);
        }
        if device.size > 0 {
            let free_gb = device.free_space as f64 / 1_073_741_824.0;
            let total_gb = device.size as f64 / 1_073_741_824.0;
            println!("    Space: {:.1} GB free / {:.1} GB total", free_gb, total_gb);
        }
    }

    println!();
    println!(
        "Looking for {}; set {} in the config to change it.",
        config.device_name.bold(),
        "device_name".dimmed()
    );

    Ok(())
}

/// Handle the `config` command
pub async fn config(init: bool) -> Result<()> {
    let config = Config::load()?;

    if init {
        let path = config.save()?;
        println!("{} {}", "Configuration written to".green(), path.display());
        return Ok(());
    }

    let path = Config::config_path()?;
    println!("{} {}", "Configuration file:".cyan(), path.display());
    if !path.exists() {
        println!("{}", "(not created yet, showing defaults)".dimmed());
    }
    println!();

    let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{}", json);

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = <super::Cli as clap::CommandFactory>::command();
    generate(shell, &mut cmd, "tunegrab", &mut io::stdout());
}

async fn fetch_tracks(config: &Config, url: &str, credentials: CredentialArgs) -> Result<Vec<Track>> {
    let creds = AuthManager::resolve(credentials.client_id, credentials.client_secret);
    let resolver = build_resolver(config, creds)?;

    println!("{} {}", "Fetching tracks from".cyan(), url);
    let tracks = resolver.resolve(url).await?;
    Ok(tracks)
}

/// Save fetched tracks; returns false when there was nothing to save
fn persist_tracks(tracks: &[Track], path: &Path) -> Result<bool> {
    if !save_tracks(tracks, path)? {
        println!("{}", "No tracks found.".yellow());
        return Ok(false);
    }

    println!(
        "{} {} tracks to {}",
        "Saved".green(),
        tracks.len(),
        path.display()
    );
    Ok(true)
}

async fn download_list(config: &Config, list_path: &Path, report_path: Option<&Path>) -> Result<()> {
    let tracks = load_tracks(list_path)?;
    if tracks.is_empty() {
        println!("{}", "Track list is empty, nothing to download.".yellow());
        return Ok(());
    }

    let tools = provision_tools(config).await?;
    let destination = resolve_destination(&config.device_name, config.music_dir.clone()).await;
    println!(
        "{} {} tracks to {}",
        "Downloading".cyan(),
        tracks.len(),
        destination.display()
    );
    println!();

    let mut driver = PipelineDriver::from_config(config, &tools, destination)?;
    let report = driver.run(&tracks).await?;

    print_report(&report);
    finish_report(&report, report_path)
}

async fn provision_tools(config: &Config) -> Result<ToolPaths> {
    let provisioner = ToolProvisioner::from_config(config)?;
    provisioner
        .ensure_all()
        .await
        .context("Failed to provision external tools")
}

fn print_report(report: &RunReport) {
    println!();
    println!("{}", "Summary".bold());
    println!("  {} {}", "Downloaded:".green(), report.succeeded());
    if report.skipped() > 0 {
        println!("  {} {}", "Skipped:".yellow(), report.skipped());
    }
    if report.failed() > 0 {
        println!("  {} {}", "Failed:".red(), report.failed());
        for outcome in report.failures() {
            if let TrackStatus::Failed { stage, error } = &outcome.status {
                println!(
                    "    {} - {} ({}): {}",
                    outcome.title,
                    outcome.artist,
                    stage,
                    error.dimmed()
                );
            }
        }
    }
    println!("  Destination: {}", report.destination.display());
}

fn finish_report(report: &RunReport, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        report.save(path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}
