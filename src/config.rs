//! Plugin settings and configuration management

use crate::error::{Error, Result};
use crate::state::{clamp_volume, Channel};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CHANNEL1_URL: &str = "https://stream-relay-geo.ntslive.net/stream?client=direct";
pub const DEFAULT_CHANNEL2_URL: &str = "https://stream-relay-geo.ntslive.net/stream2?client=direct";
pub const DEFAULT_METADATA_URL: &str = "https://www.nts.live/api/v2/live";
pub const DEFAULT_USER_AGENT: &str = "decky-nts/1.0";
pub const DEFAULT_SOCKET_NAME: &str = "mpv-nts.sock";

/// Plugin settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the player control socket
    pub runtime_dir: PathBuf,
    /// File name of the control socket inside `runtime_dir`
    pub socket_name: String,
    /// Stream for channel 1
    pub channel1_url: String,
    /// Stream for channel 2
    pub channel2_url: String,
    /// Now/next metadata endpoint
    pub metadata_url: String,
    /// User-Agent sent with metadata requests
    pub user_agent: String,
    pub metadata_timeout_secs: u64,
    pub metadata_interval_secs: u64,
    pub watchdog_interval_ms: u64,
    pub ipc_timeout_ms: u64,
    /// Initial volume, clamped to 0-100 when read
    #[serde(deserialize_with = "deserialize_volume")]
    pub volume: u8,
    /// Initial autoconnect flag
    pub autoconnect: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            runtime_dir: default_runtime_dir(),
            socket_name: DEFAULT_SOCKET_NAME.to_string(),
            channel1_url: DEFAULT_CHANNEL1_URL.to_string(),
            channel2_url: DEFAULT_CHANNEL2_URL.to_string(),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            metadata_timeout_secs: 5,
            metadata_interval_secs: 15,
            watchdog_interval_ms: 2000,
            ipc_timeout_ms: 250,
            volume: 70,
            autoconnect: true,
        }
    }
}

fn deserialize_volume<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u8, D::Error> {
    i64::deserialize(deserializer).map(clamp_volume)
}

fn default_runtime_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
}

impl Settings {
    /// Load settings from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.channel1_url.is_empty() || self.channel2_url.is_empty() {
            return Err(Error::config("Stream URLs cannot be empty"));
        }
        if self.metadata_url.is_empty() {
            return Err(Error::config("Metadata URL cannot be empty"));
        }
        if self.socket_name.is_empty() {
            return Err(Error::config("Socket name cannot be empty"));
        }
        if self.watchdog_interval_ms == 0 || self.metadata_interval_secs == 0 {
            return Err(Error::config("Polling intervals must be greater than zero"));
        }
        if self.metadata_timeout_secs == 0 || self.ipc_timeout_ms == 0 {
            return Err(Error::config("Timeouts must be greater than zero"));
        }
        Ok(())
    }

    /// Full path of the player control socket
    pub fn ipc_path(&self) -> PathBuf {
        self.runtime_dir.join(&self.socket_name)
    }

    pub fn stream_url(&self, channel: Channel) -> &str {
        match channel {
            Channel::One => &self.channel1_url,
            Channel::Two => &self.channel2_url,
        }
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn metadata_interval(&self) -> Duration {
        Duration::from_secs(self.metadata_interval_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn ipc_timeout(&self) -> Duration {
        Duration::from_millis(self.ipc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.channel1_url, DEFAULT_CHANNEL1_URL);
        assert_eq!(settings.channel2_url, DEFAULT_CHANNEL2_URL);
        assert_eq!(settings.metadata_url, DEFAULT_METADATA_URL);
        assert_eq!(settings.volume, 70);
        assert!(settings.autoconnect);
        assert_eq!(settings.watchdog_interval(), Duration::from_secs(2));
        assert_eq!(settings.metadata_interval(), Duration::from_secs(15));
        assert!(settings.ipc_path().ends_with("mpv-nts.sock"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let loaded = Settings::load(&dir.path().join("absent.json"))?;
        assert_eq!(loaded, Settings::default());
        Ok(())
    }

    #[test]
    fn test_settings_save_and_load() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.runtime_dir = dir.path().to_path_buf();
        settings.volume = 42;
        settings.autoconnect = false;
        settings.save(&config_path)?;

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded, settings);
        Ok(())
    }

    #[test]
    fn test_partial_file_and_volume_clamp() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{"volume": 250, "watchdog_interval_ms": 500}"#)?;

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded.volume, 100);
        assert_eq!(loaded.watchdog_interval(), Duration::from_millis(500));
        assert_eq!(loaded.channel2_url, DEFAULT_CHANNEL2_URL);

        for (raw, expected) in [("300", 100), ("-5", 0), ("64", 64)] {
            fs::write(&config_path, format!(r#"{{"volume": {raw}}}"#))?;
            assert_eq!(Settings::load(&config_path)?.volume, expected, "volume {raw}");
        }
        Ok(())
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.channel1_url.clear();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.watchdog_interval_ms = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.socket_name.clear();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.metadata_timeout_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.ipc_timeout_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_stream_url_per_channel() {
        let settings = Settings::default();
        assert_eq!(settings.stream_url(Channel::One), DEFAULT_CHANNEL1_URL);
        assert_eq!(settings.stream_url(Channel::Two), DEFAULT_CHANNEL2_URL);
    }
}
