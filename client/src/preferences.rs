//! Small per-user conveniences kept between runs.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Rule set used by the last submission.
    #[serde(default)]
    pub last_rule_set_id: Option<i64>,
}

pub trait PreferenceStore {
    fn load(&self) -> Result<Preferences, ClientError>;
    fn save(&self, preferences: &Preferences) -> Result<(), ClientError>;
}

/// Preferences as a JSON file. A missing file reads as defaults.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FilePreferenceStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn prefs_error(path: &Path, e: impl std::fmt::Display) -> ClientError {
    ClientError::Preferences(format!("{}: {}", path.display(), e))
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Preferences, ClientError> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| prefs_error(&self.path, e))?;
        serde_json::from_str(&raw).map_err(|e| prefs_error(&self.path, e))
    }

    fn save(&self, preferences: &Preferences) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| prefs_error(parent, e))?;
        }
        let raw =
            serde_json::to_string_pretty(preferences).map_err(|e| prefs_error(&self.path, e))?;
        fs::write(&self.path, raw).map_err(|e| prefs_error(&self.path, e))
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    inner: Mutex<Preferences>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences, ClientError> {
        self.inner
            .lock()
            .map(|p| p.clone())
            .map_err(|_| ClientError::Preferences("store poisoned".to_string()))
    }

    fn save(&self, preferences: &Preferences) -> Result<(), ClientError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ClientError::Preferences("store poisoned".to_string()))?;
        *inner = preferences.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("nested/prefs.json"));
        assert_eq!(store.load().unwrap(), Preferences::default());

        let prefs = Preferences {
            last_rule_set_id: Some(7),
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), prefs);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{not json").unwrap();
        let err = FilePreferenceStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ClientError::Preferences(_)));
    }

    #[test]
    fn memory_store_keeps_last_save() {
        let store = MemoryPreferenceStore::default();
        store
            .save(&Preferences {
                last_rule_set_id: Some(3),
            })
            .unwrap();
        assert_eq!(store.load().unwrap().last_rule_set_id, Some(3));
    }
}
