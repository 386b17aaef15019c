//! External tool provisioning (ffmpeg, ffprobe, yt-dlp)

pub mod platform;
pub mod provisioner;

pub use platform::Tool;
pub use provisioner::{ToolPaths, ToolProvisioner};
