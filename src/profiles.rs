// src/profiles.rs
//
// Named profile documents on disk.
//
// A profile is one pretty-printed JSON file `<name>.json` in the profile
// directory. Saving is always an explicit act: nothing here runs on exit.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;

/// Name of the profile loaded automatically at startup.
pub const DEFAULT_PROFILE: &str = "default";

const PROFILE_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to load profile '{name}': {reason}")]
    Load { name: String, reason: String },

    #[error("failed to save profile '{name}': {reason}")]
    Save { name: String, reason: String },

    #[error("invalid profile name '{0}'")]
    InvalidName(String),

    #[error("profile '{name}' is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

impl From<ProfileError> for String {
    fn from(e: ProfileError) -> Self {
        e.to_string()
    }
}

/// Directory-backed profile store.
#[derive(Clone, Debug)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config dir>/serialtap/profiles`.
    pub fn default_dir() -> PathBuf {
        crate::settings::app_dir().join("profiles")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, ProfileError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.{}", name, PROFILE_EXTENSION)))
    }

    /// Write `config` under `name`, replacing any existing profile.
    pub fn save(&self, name: &str, config: &Config) -> Result<PathBuf, ProfileError> {
        let path = self.path_for(name)?;
        let save_err = |reason: String| ProfileError::Save {
            name: name.to_string(),
            reason,
        };

        fs::create_dir_all(&self.dir)
            .map_err(|e| save_err(format!("create {}: {}", self.dir.display(), e)))?;

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| save_err(format!("serialize: {}", e)))?;

        fs::write(&path, content).map_err(|e| save_err(format!("write {}: {}", path.display(), e)))?;

        tlog!("[profile] Saved '{}' to {}", name, path.display());
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Config, ProfileError> {
        let path = self.path_for(name)?;
        load_file(name, &path)
    }

    /// Load a profile document from an arbitrary path (e.g. picked in a file dialog).
    pub fn load_path(&self, path: &Path) -> Result<Config, ProfileError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("?")
            .to_string();
        load_file(&name, path)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn save_default(&self, config: &Config) -> Result<PathBuf, ProfileError> {
        self.save(DEFAULT_PROFILE, config)
    }

    /// Startup load of the default profile. `Ok(None)` when there is none yet.
    pub fn load_default(&self) -> Result<Option<Config>, ProfileError> {
        if !self.exists(DEFAULT_PROFILE) {
            return Ok(None);
        }
        self.load(DEFAULT_PROFILE).map(Some)
    }

    /// Names of all stored profiles, sorted.
    pub fn list(&self) -> Result<Vec<String>, ProfileError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ProfileError::Load {
                    name: "*".to_string(),
                    reason: format!("read {}: {}", self.dir.display(), e),
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some(PROFILE_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}

fn load_file(name: &str, path: &Path) -> Result<Config, ProfileError> {
    let content = fs::read_to_string(path).map_err(|e| ProfileError::Load {
        name: name.to_string(),
        reason: format!("read {}: {}", path.display(), e),
    })?;

    let config: Config = serde_json::from_str(&content).map_err(|e| ProfileError::Load {
        name: name.to_string(),
        reason: format!("parse: {}", e),
    })?;

    config.validate().map_err(|reason| ProfileError::Invalid {
        name: name.to_string(),
        reason,
    })?;

    tlog!("[profile] Loaded '{}' from {}", name, path.display());
    Ok(config)
}

fn validate_name(name: &str) -> Result<(), ProfileError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.starts_with('.')
        || name.contains(['/', '\\', ':'])
    {
        return Err(ProfileError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Theme, COMMAND_SLOTS};

    fn store() -> (tempfile::TempDir, ProfileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));
        (dir, store)
    }

    #[test]
    fn test_round_trip_preserves_every_slot() {
        let (_dir, store) = store();
        let mut cfg = Config::for_port("/dev/ttyUSB0", 9600);
        cfg.theme = Theme::WhiteOnBlue;
        cfg.repeat_interval_secs = 3.9430133845633675;
        cfg.repeat_count = 7;
        cfg.set_command(0, "AT").unwrap();
        cfg.set_command(5, "AT+GMR").unwrap();
        cfg.set_command(39, "привет").unwrap();

        store.save("bench", &cfg).unwrap();
        let loaded = store.load("bench").unwrap();

        assert_eq!(loaded, cfg);
        assert_eq!(loaded.commands.len(), COMMAND_SLOTS);
        assert_eq!(loaded.command(1), Some(""));
    }

    #[test]
    fn test_overwrite_is_last_write_wins() {
        let (_dir, store) = store();
        store.save("p", &Config::for_port("COM1", 9600)).unwrap();
        store.save("p", &Config::for_port("COM2", 19200)).unwrap();
        let loaded = store.load("p").unwrap();
        assert_eq!(loaded.port, "COM2");
        assert_eq!(loaded.baud, 19200);
    }

    #[test]
    fn test_missing_repeat_count_defaults_to_unbounded() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.path_for("old").unwrap(),
            r#"{"port": "VIRTUAL", "baud": 57600, "theme": "blue", "repeatIntervalSeconds": 2.0}"#,
        )
        .unwrap();

        let cfg = store.load("old").unwrap();
        assert_eq!(cfg.repeat_count, 0);
        assert_eq!(cfg.baud, 57600);
        assert_eq!(cfg.theme, Theme::Blue);
    }

    #[test]
    fn test_loads_file_with_both_repeat_key_styles() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.path_for("resaved").unwrap(),
            r#"{"port": "VIRTUAL", "theme": null, "repeatIntervalSeconds": 1.5, "repeatCount": 2,
                "repeat_sec": 9.0, "repeat_cnt": 9}"#,
        )
        .unwrap();

        let cfg = store.load("resaved").unwrap();
        assert_eq!(cfg.repeat_interval_secs, 1.5);
        assert_eq!(cfg.repeat_count, 2);
        assert_eq!(cfg.theme, Theme::Dark);
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.path_for("future").unwrap(),
            r#"{"port": "VIRTUAL", "line_ending": "crlf", "window": {"w": 1200}}"#,
        )
        .unwrap();
        assert!(store.load("future").is_ok());
    }

    #[test]
    fn test_load_failures() {
        let (_dir, store) = store();
        assert!(matches!(store.load("absent"), Err(ProfileError::Load { .. })));

        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for("broken").unwrap(), "{ not json").unwrap();
        assert!(matches!(store.load("broken"), Err(ProfileError::Load { .. })));

        fs::write(store.path_for("zero").unwrap(), r#"{"baud": 0}"#).unwrap();
        assert!(matches!(store.load("zero"), Err(ProfileError::Invalid { .. })));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (_dir, store) = store();
        for name in ["", " ", "../escape", "a/b", ".hidden", "c:\\x"] {
            assert!(
                matches!(store.save(name, &Config::default()), Err(ProfileError::InvalidName(_))),
                "accepted {:?}",
                name
            );
        }
    }

    #[test]
    fn test_default_profile() {
        let (_dir, store) = store();
        assert!(store.load_default().unwrap().is_none());

        let mut cfg = Config::default();
        cfg.theme = Theme::Amber;
        store.save_default(&cfg).unwrap();
        assert_eq!(store.load_default().unwrap(), Some(cfg));
    }

    #[test]
    fn test_list_profiles() {
        let (_dir, store) = store();
        assert!(store.list().unwrap().is_empty());
        store.save("zeta", &Config::default()).unwrap();
        store.save("alpha", &Config::default()).unwrap();
        fs::write(store.dir().join("notes.txt"), "x").unwrap();
        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_load_path() {
        let (dir, store) = store();
        let path = dir.path().join("elsewhere.json");
        fs::write(&path, r#"{"port": "COM9"}"#).unwrap();
        assert_eq!(store.load_path(&path).unwrap().port, "COM9");
    }
}
