//! Destination detection and library layout

pub mod detection;
pub mod storage;

use std::path::PathBuf;
use tracing::{debug, info};

pub use detection::DeviceDetector;
pub use storage::{LibraryStorage, track_paths};

/// Pick the music destination: attached player first, local folder otherwise
///
/// The device scan shells out, so it runs on the blocking pool.
pub async fn resolve_destination(device_name: &str, fallback: PathBuf) -> PathBuf {
    let name = device_name.to_string();
    let found = match tokio::task::spawn_blocking(move || DeviceDetector::find_music_dir(&name)).await {
        Ok(found) => found,
        Err(e) => {
            debug!("Device scan task failed: {}", e);
            None
        }
    };

    match found {
        Some(dir) => {
            info!("Found {} at {}", device_name, dir.display());
            dir
        }
        None => {
            info!("{} not attached, using {}", device_name, fallback.display());
            fallback
        }
    }
}
