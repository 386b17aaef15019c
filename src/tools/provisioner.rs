//! Download-once provisioning of external binaries
//!
//! A binary is considered provisioned when `<tools_dir>/<binary>` exists.
//! Nothing checks versions or checksums.

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::platform::{Platform, Tool, ToolSource, default_source};
use crate::config::Config;

/// Resolved programs for every tool; unprovisioned tools fall back to `PATH`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub ytdlp: PathBuf,
}

impl ToolPaths {
    /// Plain program names, looked up on `PATH` at spawn time
    pub fn system() -> Self {
        Self {
            ffmpeg: PathBuf::from(Tool::Ffmpeg.name()),
            ffprobe: PathBuf::from(Tool::Ffprobe.name()),
            ytdlp: PathBuf::from(Tool::YtDlp.name()),
        }
    }

    fn set(&mut self, tool: Tool, path: PathBuf) {
        match tool {
            Tool::Ffmpeg => self.ffmpeg = path,
            Tool::Ffprobe => self.ffprobe = path,
            Tool::YtDlp => self.ytdlp = path,
        }
    }
}

/// Makes external tools available under a local directory
pub struct ToolProvisioner {
    tools_dir: PathBuf,
    platform: Platform,
    overrides: HashMap<String, String>,
    http_client: Client,
}

impl ToolProvisioner {
    pub fn new(
        tools_dir: PathBuf,
        platform: Platform,
        overrides: HashMap<String, String>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("tunegrab/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            tools_dir,
            platform,
            overrides,
            http_client,
        })
    }

    /// Provisioner for the host platform using configured paths and overrides
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.tools_dir.clone(),
            Platform::current(),
            config.tool_urls.clone(),
        )
    }

    /// Where a tool lives once provisioned
    pub fn binary_path(&self, tool: Tool) -> PathBuf {
        self.tools_dir.join(self.platform.binary_name(tool.name()))
    }

    /// Download source for a tool: config override first, then the known default
    pub fn source_for(&self, tool: Tool) -> Option<ToolSource> {
        self.overrides
            .get(tool.name())
            .map(|url| ToolSource::from_url(url))
            .or_else(|| default_source(tool, self.platform))
    }

    /// Make sure a tool is present, downloading it if necessary
    ///
    /// Returns `None` when the tool is missing and no download is known for
    /// this platform; callers then rely on the tool being on `PATH`.
    pub async fn ensure(&self, tool: Tool) -> Result<Option<PathBuf>> {
        let binary_path = self.binary_path(tool);
        if binary_path.exists() {
            debug!("{} already provisioned at {}", tool, binary_path.display());
            return Ok(Some(binary_path));
        }

        let Some(source) = self.source_for(tool) else {
            warn!(
                "No {} download known for {}. Install it manually and make sure it is on your PATH.",
                tool, self.platform
            );
            return Ok(None);
        };

        tokio::fs::create_dir_all(&self.tools_dir)
            .await
            .with_context(|| format!("Failed to create tools directory {:?}", self.tools_dir))?;

        info!("Downloading {}...", tool);

        match &source {
            ToolSource::Archive(url) => self.install_from_archive(tool, url, &source).await?,
            ToolSource::Binary(url) => {
                let partial = partial_path(&binary_path);
                if let Err(e) = self.download_to_file(url, &partial).await {
                    remove_partial(&partial);
                    return Err(e);
                }
                fs::rename(&partial, &binary_path)
                    .with_context(|| format!("Failed to install {}", binary_path.display()))?;
                make_executable(&binary_path)?;
            }
        }

        info!("{} installed at {}", tool, binary_path.display());
        Ok(Some(binary_path))
    }

    /// Download an archive once and install `tool` from it, along with any
    /// other missing tool shipped in the same archive
    async fn install_from_archive(&self, tool: Tool, url: &str, source: &ToolSource) -> Result<()> {
        let archive_path = self.tools_dir.join(format!("{}.zip", tool.name()));
        self.download_to_file(url, &archive_path).await?;

        let mut targets = vec![(tool, self.binary_path(tool))];
        for other in Tool::ALL {
            let other_path = self.binary_path(other);
            if other != tool
                && !other_path.exists()
                && self.source_for(other).as_ref() == Some(source)
            {
                targets.push((other, other_path));
            }
        }

        let results = {
            let archive_path = archive_path.clone();
            let platform = self.platform;
            tokio::task::spawn_blocking(move || {
                targets
                    .into_iter()
                    .map(|(tool, dest)| {
                        let binary_name = platform.binary_name(tool.name());
                        let result = install_binary(&archive_path, &binary_name, &dest);
                        (tool, dest, result)
                    })
                    .collect::<Vec<_>>()
            })
            .await
            .context("Archive extraction task panicked")?
        };

        if let Err(e) = fs::remove_file(&archive_path) {
            debug!("Failed to remove {}: {}", archive_path.display(), e);
        }

        let mut installed = Ok(());
        for (extracted, dest, result) in results {
            if extracted == tool {
                installed = result;
            } else {
                match result {
                    Ok(()) => info!("{} installed at {}", extracted, dest.display()),
                    Err(e) => warn!("Could not install {} from the same archive: {:#}", extracted, e),
                }
            }
        }
        installed
    }

    /// Ensure every tool, falling back to bare program names where needed
    pub async fn ensure_all(&self) -> Result<ToolPaths> {
        let mut paths = ToolPaths::system();
        for tool in Tool::ALL {
            if let Some(path) = self.ensure(tool).await? {
                paths.set(tool, path);
            }
        }
        Ok(paths)
    }

    /// Stream a URL to a file on disk
    async fn download_to_file(&self, url: &str, dest: &Path) -> Result<()> {
        debug!("Downloading {} -> {}", url, dest.display());

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Download of {} failed with status {}", url, response.status());
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read download stream")?;
            file.write_all(&chunk)
                .await
                .context("Failed to write download to disk")?;
        }
        file.flush().await.context("Failed to flush download")?;

        Ok(())
    }
}

/// Extract `binary_name` next to `dest`, then move it into place
///
/// `dest` only ever appears complete; a failed extraction leaves nothing behind.
fn install_binary(archive_path: &Path, binary_name: &str, dest: &Path) -> Result<()> {
    let partial = partial_path(dest);
    if let Err(e) = unpack_binary(archive_path, binary_name, &partial) {
        remove_partial(&partial);
        return Err(e);
    }

    fs::rename(&partial, dest).with_context(|| format!("Failed to install {}", dest.display()))?;
    make_executable(dest)
}

fn partial_path(dest: &Path) -> PathBuf {
    dest.with_extension("download")
}

fn remove_partial(partial: &Path) {
    if let Err(e) = fs::remove_file(partial)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        debug!("Failed to remove {}: {}", partial.display(), e);
    }
}

/// Extract the entry named `binary_name` (at any depth) from a zip archive
fn unpack_binary(archive_path: &Path, binary_name: &str, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("Failed to read zip archive")?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .context("Failed to read archive entry")?;
        if !entry.is_file() {
            continue;
        }

        let name = entry.name().replace('\\', "/");
        if name.rsplit('/').next() != Some(binary_name) {
            continue;
        }

        let mut output = fs::File::create(dest)
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        std::io::copy(&mut entry, &mut output)
            .with_context(|| format!("Failed to extract {}", name))?;

        debug!("Extracted {} to {}", name, dest.display());
        return Ok(());
    }

    anyhow::bail!(
        "{} not found in archive {}",
        binary_name,
        archive_path.display()
    )
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to make {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
