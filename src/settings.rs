// src/settings.rs
//
// Application settings (where profiles and logs live, poll cadence), kept in
// `settings.toml` under the user config directory. Separate from profiles:
// a profile describes a device session, settings describe the installation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::profiles::ProfileStore;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: String,
    /// Saved session logs and diagnostic log files
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub file_logging: bool,
    /// Appended to every manual send
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
}

fn default_profiles_dir() -> String {
    ProfileStore::default_dir().to_string_lossy().to_string()
}
fn default_log_dir() -> String {
    app_dir().join("logs").to_string_lossy().to_string()
}
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_line_terminator() -> String {
    "\r".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            profiles_dir: default_profiles_dir(),
            log_dir: default_log_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            file_logging: false,
            line_terminator: default_line_terminator(),
        }
    }
}

impl AppSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn profile_store(&self) -> ProfileStore {
        ProfileStore::new(&self.profiles_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.log_dir)
    }
}

/// `<config dir>/serialtap`, or the working directory when the platform has
/// no config dir.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("serialtap")
}

pub fn default_settings_path() -> PathBuf {
    app_dir().join("settings.toml")
}

/// Load settings from `path`. A missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<AppSettings, String> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings: {}", e))?;
    toml::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
}

/// Load settings, falling back to defaults on any error (reported via tlog).
pub fn load_settings_or_default(path: &Path) -> AppSettings {
    match load_settings(path) {
        Ok(settings) => settings,
        Err(e) => {
            tlog!("[settings] {} ({}), using defaults", e, path.display());
            AppSettings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create settings dir: {}", e))?;
    }
    initialize_directories(settings)?;

    let content = toml::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
}

fn initialize_directories(settings: &AppSettings) -> Result<(), String> {
    std::fs::create_dir_all(&settings.profiles_dir)
        .map_err(|e| format!("Failed to create profiles directory: {}", e))?;
    std::fs::create_dir_all(&settings.log_dir)
        .map_err(|e| format!("Failed to create log directory: {}", e))?;
    Ok(())
}
