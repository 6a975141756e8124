//! JSON settings store.
//!
//! Persists all user configuration as a flat string-keyed map in a single
//! JSON file. Writes go to a temporary file in the same directory and are
//! committed with an atomic rename, so a crash mid-write never corrupts the
//! existing file. The internal mutex serializes rapid save calls.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Settings key names.
pub mod keys {
    pub const HOTKEYS: &str = "HotKeys";
    pub const QUICK_SWITCH_HOTKEY: &str = "QuickSwitchHotKey";
    pub const FAVOURITE_DEVICES: &str = "FavouriteDevices";
    pub const ENABLE_QUICK_SWITCH: &str = "EnableQuickSwitch";
    pub const DUAL_SWITCH_MODE: &str = "DualSwitchMode";
    pub const DISABLE_HOTKEYS: &str = "DisableHotKeys";
    pub const SHOW_UNKNOWN_DEVICES: &str = "ShowUnknownDevicesInHotkeyList";
    pub const STARTUP_PLAYBACK_DEVICE: &str = "StartupPlaybackDeviceID";
}

/// Settings store error types.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Settings file has no parent directory: {0}")]
    NoParentDir(PathBuf),
}

/// File-backed string key/value settings store.
pub struct JsonSettings {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonSettings {
    /// Create a store backed by the given file. Does not touch the disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Create a store and immediately load any existing file contents.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let settings = Self::new(path);
        settings.load();
        settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory map with the file contents. A missing or
    /// unparseable file yields an empty map; the file on disk is left alone
    /// so a later successful save is the only thing that rewrites it.
    pub fn load(&self) {
        let mut values = self.values.lock().unwrap();
        *values = match std::fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e,
                        "settings file is not valid JSON, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e,
                    "could not read settings file, starting empty");
                HashMap::new()
            }
        };
    }

    /// Persist the current map. Writes to a sibling temp file and renames it
    /// over the target so the previous contents survive a failed write.
    pub fn save(&self) -> Result<(), SettingsError> {
        let values = self.values.lock().unwrap();
        self.write_map(&values)
    }

    fn write_map(&self, values: &HashMap<String, String>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(values).map_err(SettingsError::Serialize)?;

        let dir = self
            .path
            .parent()
            .ok_or_else(|| SettingsError::NoParentDir(self.path.clone()))?;
        std::fs::create_dir_all(dir).map_err(|e| SettingsError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".settings")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| SettingsError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| SettingsError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        tmp.persist(&self.path)
            .map_err(|e| SettingsError::WriteFailed {
                path: self.path.clone(),
                source: e.error,
            })?;

        Ok(())
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Set a value and persist immediately. Write failures are hard errors:
    /// silent loss of binding or favourite data is unacceptable.
    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap();
        values.insert(key.to_string(), value.into());
        self.write_map(&values)
    }

    /// Get a boolean flag, defaulting when absent or malformed.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(default)
    }

    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.set(key, value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JsonSettings::new(dir.path().join("settings.json"));

        settings.set(keys::HOTKEYS, "[65,2,{x}]").unwrap();
        assert_eq!(settings.get(keys::HOTKEYS).as_deref(), Some("[65,2,{x}]"));

        // A fresh store over the same file sees the persisted value.
        let reopened = JsonSettings::open(dir.path().join("settings.json"));
        assert_eq!(reopened.get(keys::HOTKEYS).as_deref(), Some("[65,2,{x}]"));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JsonSettings::open(dir.path().join("nope.json"));
        assert_eq!(settings.get(keys::HOTKEYS), None);
    }

    #[test]
    fn corrupt_file_loads_empty_without_clobbering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let settings = JsonSettings::open(&path);
        assert_eq!(settings.get(keys::FAVOURITE_DEVICES), None);

        // Load alone must not rewrite the file.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn bool_flags_default_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JsonSettings::new(dir.path().join("settings.json"));
        assert!(!settings.get_bool(keys::DUAL_SWITCH_MODE, false));
        settings.set_bool(keys::DUAL_SWITCH_MODE, true).unwrap();
        assert!(settings.get_bool(keys::DUAL_SWITCH_MODE, false));
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JsonSettings::new(dir.path().join("nested").join("settings.json"));
        settings.set(keys::ENABLE_QUICK_SWITCH, "true").unwrap();
        assert!(dir.path().join("nested").join("settings.json").exists());
    }
}
