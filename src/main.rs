//! tunegrab - Download Spotify playlists as tagged audio files

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod device;
mod media;
mod pipeline;
mod spotify;
mod tools;
mod tracks;
mod utils;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "tunegrab=debug,reqwest=debug"
    } else {
        "tunegrab=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Auth {
            credentials,
            clear,
            login,
        } => {
            cli::commands::auth(credentials, clear, login).await?;
        }
        Commands::Fetch {
            url,
            tracks,
            credentials,
        } => {
            cli::commands::fetch(url, tracks, credentials).await?;
        }
        Commands::Download { tracks, output } => {
            cli::commands::download(tracks, output).await?;
        }
        Commands::Run {
            url,
            tracks,
            credentials,
            output,
        } => {
            cli::commands::run(url, tracks, credentials, output).await?;
        }
        Commands::Track {
            query,
            title,
            artist,
            album,
            cover,
            output,
        } => {
            cli::commands::track(query, title, artist, album, cover, output).await?;
        }
        Commands::Tools => {
            cli::commands::tools().await?;
        }
        Commands::Devices => {
            cli::commands::devices().await?;
        }
        Commands::Config { init } => {
            cli::commands::config(init).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
