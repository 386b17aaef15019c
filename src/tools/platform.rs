//! Host platform detection and known tool download sources

use std::fmt;

/// Operating system family, as far as tool downloads are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
    Other,
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// Executable file name for a tool on this platform
    pub fn binary_name(self, tool: &str) -> String {
        match self {
            Platform::Windows => format!("{}.exe", tool),
            _ => tool.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::MacOs => "macOS",
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Other => "this platform",
        };
        f.write_str(name)
    }
}

/// External tools the pipeline relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
    YtDlp,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Ffmpeg, Tool::Ffprobe, Tool::YtDlp];

    /// Program name, also used as the config override key
    pub fn name(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::YtDlp => "yt-dlp",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a tool is distributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// Zip archive containing the binary somewhere inside
    Archive(String),
    /// The binary itself
    Binary(String),
}

impl ToolSource {
    pub fn url(&self) -> &str {
        match self {
            ToolSource::Archive(url) | ToolSource::Binary(url) => url,
        }
    }

    /// Guess the kind of source from a URL (used for config overrides)
    pub fn from_url(url: &str) -> Self {
        if url.to_ascii_lowercase().ends_with(".zip") {
            ToolSource::Archive(url.to_string())
        } else {
            ToolSource::Binary(url.to_string())
        }
    }
}

const EVERMEET_FFMPEG: &str = "https://evermeet.cx/ffmpeg/ffmpeg-6.1.1.zip";
const EVERMEET_FFPROBE: &str = "https://evermeet.cx/ffmpeg/ffprobe-6.1.1.zip";
const GYAN_ESSENTIALS: &str = "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip";
const YTDLP_RELEASES: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download";

/// Known download source for a tool on a platform
pub fn default_source(tool: Tool, platform: Platform) -> Option<ToolSource> {
    match (tool, platform) {
        (Tool::Ffmpeg, Platform::MacOs) => Some(ToolSource::Archive(EVERMEET_FFMPEG.to_string())),
        (Tool::Ffprobe, Platform::MacOs) => Some(ToolSource::Archive(EVERMEET_FFPROBE.to_string())),
        (Tool::Ffmpeg | Tool::Ffprobe, Platform::Windows) => {
            Some(ToolSource::Archive(GYAN_ESSENTIALS.to_string()))
        }
        (Tool::YtDlp, Platform::MacOs) => {
            Some(ToolSource::Binary(format!("{}/yt-dlp_macos", YTDLP_RELEASES)))
        }
        (Tool::YtDlp, Platform::Windows) => {
            Some(ToolSource::Binary(format!("{}/yt-dlp.exe", YTDLP_RELEASES)))
        }
        (Tool::YtDlp, Platform::Linux) => {
            Some(ToolSource::Binary(format!("{}/yt-dlp_linux", YTDLP_RELEASES)))
        }
        _ => None,
    }
}
