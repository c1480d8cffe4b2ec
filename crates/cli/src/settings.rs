use std::fs;
use std::path::{Path, PathBuf};

use mocap_stream_core::shared::channel_id::ChannelId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Host settings that survive between runs.
///
/// Every channel starts disabled; missing keys load as their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint_url: Option<String>,
    pub face: bool,
    pub hands: bool,
    pub pose: bool,
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Mocap Stream").join("settings.json"))
    }

    /// Loads from the platform config directory, falling back to defaults
    /// when the file is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(SettingsError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring settings: {e}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn is_enabled(&self, channel: ChannelId) -> bool {
        match channel {
            ChannelId::Face => self.face,
            ChannelId::Hands => self.hands,
            ChannelId::Pose => self.pose,
        }
    }

    pub fn enabled_channels(&self) -> Vec<ChannelId> {
        ChannelId::ALL
            .iter()
            .copied()
            .filter(|&c| self.is_enabled(c))
            .collect()
    }

    /// Replaces the enable flags with exactly `channels`.
    pub fn set_enabled_channels(&mut self, channels: &[ChannelId]) {
        self.face = channels.contains(&ChannelId::Face);
        self.hands = channels.contains(&ChannelId::Hands);
        self.pose = channels.contains(&ChannelId::Pose);
    }
}
