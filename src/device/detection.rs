//! Portable player detection
//!
//! Linux uses lsblk, macOS lists /Volumes, Windows checks drive letters.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Folder on the player that receives music
const MUSIC_FOLDER: &str = "Music";

/// Detected removable volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device name (e.g., "sdb1", "E:")
    pub name: String,
    /// Volume label (e.g., "MIBAO-M500")
    pub label: Option<String>,
    /// Mount point path
    pub mount_point: PathBuf,
    /// Total size in bytes (0 when unknown)
    pub size: u64,
    /// Free space in bytes (0 when unknown)
    pub free_space: u64,
    /// Filesystem type (empty when unknown)
    pub fs_type: String,
}

impl Device {
    /// Label if present, otherwise the device name
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Whether this device looks like the player called `wanted`
    ///
    /// Case-insensitive substring match against label and mount directory name.
    pub fn matches(&self, wanted: &str) -> bool {
        let wanted = wanted.to_lowercase();
        if wanted.is_empty() {
            return false;
        }

        let label_match = self
            .label
            .as_ref()
            .is_some_and(|l| l.to_lowercase().contains(&wanted));
        let mount_match = self
            .mount_point
            .file_name()
            .is_some_and(|n| n.to_string_lossy().to_lowercase().contains(&wanted));

        label_match || mount_match
    }

    /// Destination folder for music on this device
    pub fn music_dir(&self) -> PathBuf {
        self.mount_point.join(MUSIC_FOLDER)
    }
}

/// Detects mounted removable devices
pub struct DeviceDetector;

impl DeviceDetector {
    /// Scan for mounted removable devices
    pub fn scan() -> Result<Vec<Device>> {
        let devices = if cfg!(target_os = "macos") {
            Self::scan_volumes(Path::new("/Volumes"))?
        } else if cfg!(target_os = "windows") {
            Self::scan_drives()
        } else {
            Self::scan_lsblk()?
        };

        debug!("Found {} removable devices", devices.len());
        Ok(devices)
    }

    /// Music folder of the first device matching `name`, if one is attached
    pub fn find_music_dir(name: &str) -> Option<PathBuf> {
        match Self::scan() {
            Ok(devices) => Self::find_in(&devices, name).map(Device::music_dir),
            Err(e) => {
                debug!("Device scan failed: {:#}", e);
                None
            }
        }
    }

    /// First device in `devices` matching `name`
    pub fn find_in<'a>(devices: &'a [Device], name: &str) -> Option<&'a Device> {
        devices.iter().find(|d| d.matches(name))
    }

    fn scan_lsblk() -> Result<Vec<Device>> {
        let output = Command::new("lsblk")
            .args([
                "-J",
                "-o",
                "NAME,LABEL,MOUNTPOINT,SIZE,FSTYPE,HOTPLUG,FSAVAIL,FSSIZE",
                "-b",
            ])
            .output()
            .context("Failed to run lsblk")?;

        if !output.status.success() {
            anyhow::bail!("lsblk failed: {}", String::from_utf8_lossy(&output.stderr));
        }

        let json_output = String::from_utf8_lossy(&output.stdout);
        debug!("lsblk output: {}", json_output);
        parse_lsblk(&json_output)
    }

    /// Every directory under `root` is a mounted volume (macOS /Volumes)
    fn scan_volumes(root: &Path) -> Result<Vec<Device>> {
        let entries = std::fs::read_dir(root)
            .with_context(|| format!("Failed to list {}", root.display()))?;

        let mut devices = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            devices.push(Device {
                name: name.clone(),
                label: Some(name),
                mount_point: path,
                size: 0,
                free_space: 0,
                fs_type: String::new(),
            });
        }
        Ok(devices)
    }

    fn scan_drives() -> Vec<Device> {
        ('D'..='Z')
            .filter_map(|letter| {
                let root = PathBuf::from(format!("{}:\\", letter));
                if !root.exists() {
                    return None;
                }
                let name = format!("{}:", letter);
                let label = Command::new("cmd")
                    .args(["/C", "vol", &name])
                    .output()
                    .ok()
                    .and_then(|o| parse_vol_label(&String::from_utf8_lossy(&o.stdout)));
                Some(Device {
                    name,
                    label,
                    mount_point: root,
                    size: 0,
                    free_space: 0,
                    fs_type: String::new(),
                })
            })
            .collect()
    }
}

/// Parse `lsblk -J` output into removable, mounted devices
fn parse_lsblk(json: &str) -> Result<Vec<Device>> {
    let lsblk: LsblkOutput = serde_json::from_str(json).context("Failed to parse lsblk output")?;

    let mut devices = Vec::new();
    for block_device in &lsblk.blockdevices {
        collect_devices(block_device, &mut devices);
    }
    Ok(devices)
}

/// Recursively collect removable devices from lsblk output
fn collect_devices(block: &BlockDevice, devices: &mut Vec<Device>) {
    if let Some(mountpoint) = &block.mountpoint
        && !mountpoint.is_empty()
        && mountpoint != "[SWAP]"
        && !mountpoint.starts_with("/boot")
    {
        let is_removable = block.hotplug == Some(true)
            || mountpoint.starts_with("/run/media")
            || mountpoint.starts_with("/media")
            || mountpoint.starts_with("/mnt");

        if is_removable {
            devices.push(Device {
                name: block.name.clone(),
                label: block.label.clone(),
                mount_point: PathBuf::from(mountpoint),
                size: block.size.or(block.fssize).unwrap_or(0),
                free_space: block.fsavail.unwrap_or(0),
                fs_type: block.fstype.clone().unwrap_or_default(),
            });
        }
    }

    if let Some(children) = &block.children {
        for child in children {
            collect_devices(child, devices);
        }
    }
}

/// Extract the label from `vol` output ("Volume in drive E is MIBAO")
fn parse_vol_label(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Volume in drive"))
        .find_map(|rest| rest.split_once(" is "))
        .map(|(_, label)| label.trim().to_string())
        .filter(|label| !label.is_empty())
}

// JSON structures for lsblk output

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<BlockDevice>,
}

#[derive(Debug, Deserialize)]
struct BlockDevice {
    name: String,
    label: Option<String>,
    mountpoint: Option<String>,
    size: Option<u64>,
    fstype: Option<String>,
    hotplug: Option<bool>,
    fsavail: Option<u64>,
    fssize: Option<u64>,
    children: Option<Vec<BlockDevice>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSBLK: &str = r#"{
        "blockdevices": [
            {"name": "nvme0n1", "label": null, "mountpoint": null, "size": 512110190592,
             "fstype": null, "hotplug": false, "fsavail": null, "fssize": null,
             "children": [
                {"name": "nvme0n1p1", "label": null, "mountpoint": "/boot", "size": 536870912,
                 "fstype": "vfat", "hotplug": false, "fsavail": 400000000, "fssize": 536000000},
                {"name": "nvme0n1p2", "label": null, "mountpoint": "/", "size": 511573319680,
                 "fstype": "ext4", "hotplug": false, "fsavail": 100000000000, "fssize": 500000000000}
             ]},
            {"name": "sdb", "label": null, "mountpoint": null, "size": 7948206080,
             "fstype": null, "hotplug": true, "fsavail": null, "fssize": null,
             "children": [
                {"name": "sdb1", "label": "MIBAO-M500", "mountpoint": "/run/media/me/MIBAO-M500",
                 "size": 7948206080, "fstype": "vfat", "hotplug": true,
                 "fsavail": 5000000000, "fssize": 7940000000}
             ]}
        ]
    }"#;

    #[test]
    fn test_parse_lsblk_keeps_removable_only() {
        let devices = parse_lsblk(LSBLK).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "sdb1");
        assert_eq!(devices[0].fs_type, "vfat");
        assert_eq!(devices[0].free_space, 5000000000);
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let devices = parse_lsblk(LSBLK).unwrap();
        let found = DeviceDetector::find_in(&devices, "Mibao-M500").unwrap();
        assert_eq!(
            found.music_dir(),
            PathBuf::from("/run/media/me/MIBAO-M500/Music")
        );
        assert!(DeviceDetector::find_in(&devices, "FIIO").is_none());
        assert!(DeviceDetector::find_in(&devices, "").is_none());
    }

    #[test]
    fn test_scan_volumes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Macintosh HD")).unwrap();
        std::fs::create_dir(dir.path().join("Mibao-M500 Player")).unwrap();
        std::fs::write(dir.path().join("stray-file"), b"").unwrap();

        let devices = DeviceDetector::scan_volumes(dir.path()).unwrap();
        assert_eq!(devices.len(), 2);
        let player = DeviceDetector::find_in(&devices, "mibao-m500").unwrap();
        assert_eq!(player.display_name(), "Mibao-M500 Player");
    }

    #[test]
    fn test_parse_vol_label() {
        let output = " Volume in drive E is MIBAO-M500\r\n Volume Serial Number is 1234-ABCD\r\n";
        assert_eq!(parse_vol_label(output).as_deref(), Some("MIBAO-M500"));
        let unlabeled = " Volume in drive E has no label.\r\n Volume Serial Number is 1234-ABCD\r\n";
        assert_eq!(parse_vol_label(unlabeled), None);
    }
}
