use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Keys of the values persisted in the preference store
pub mod keys {
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const USER_ID: &str = "user_id";
    pub const REMEMBER_ME: &str = "remember_me";
    pub const TRACK_LINE_WIDTH: &str = "track_line_width";
    pub const STOP_MARKER_SIZE: &str = "stop_marker_size";
    pub const ARROW_SIZE: &str = "arrow_size";
    pub const APP_LANGUAGE: &str = "app_language";
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write preferences to '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Snapshot of all stored values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<String, Value>);

impl Preferences {
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key)?.as_i64()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key)?.as_f64()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key)?.as_bool()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Typed key-value store, persisted as a JSON file
///
/// Reads never fail: a missing or unreadable file is treated as an empty store.
/// Every edit is written through to disk before it becomes visible.
pub struct PreferenceStore {
    path: PathBuf,
    values: RwLock<Preferences>,
}

impl PreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = Self::load(&path);
        tracing::debug!(
            "Opened preference store {} with {} values",
            path.display(),
            values.len()
        );

        Self {
            path,
            values: RwLock::new(values),
        }
    }

    fn load(path: &Path) -> Preferences {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Preferences::default(),
            Err(e) => {
                tracing::warn!("Could not read preferences {}: {e}", path.display());
                return Preferences::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Preferences {} are corrupted, starting empty: {e}", path.display());
            Preferences::default()
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Preferences {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `edit` and persists the result
    ///
    /// If persisting fails the stored values stay unchanged.
    pub fn edit(&self, edit: impl FnOnce(&mut Preferences)) -> Result<(), StoreError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);

        let mut edited = values.clone();
        edit(&mut edited);
        if edited == *values {
            return Ok(());
        }

        self.persist(&edited)?;
        *values = edited;
        Ok(())
    }

    fn persist(&self, values: &Preferences) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let encoded = serde_json::to_vec_pretty(values)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        // Write aside and rename, so a crash never leaves a half written file
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_persists_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = PreferenceStore::open(&path);
        store
            .edit(|prefs| {
                prefs.set(keys::USERNAME, "operator");
                prefs.set(keys::USER_ID, 42);
                prefs.set(keys::TRACK_LINE_WIDTH, 7.5);
            })
            .unwrap();

        let reopened = PreferenceStore::open(&path).snapshot();
        assert_eq!(reopened.get_string(keys::USERNAME), Some("operator"));
        assert_eq!(reopened.get_i64(keys::USER_ID), Some(42));
        assert_eq!(reopened.get_f64(keys::TRACK_LINE_WIDTH), Some(7.5));
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();

        let store = PreferenceStore::open(dir.path().join("absent.json"));

        assert!(store.snapshot().is_empty());
        assert!(!dir.path().join("absent.json").exists());
    }

    #[test]
    fn corrupted_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json").unwrap();

        let store = PreferenceStore::open(&path);

        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn failed_writes_keep_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("prefs.json");
        fs::create_dir_all(path.join("blocker")).unwrap();

        let store = PreferenceStore::open(&path);
        let result = store.edit(|prefs| prefs.set(keys::APP_LANGUAGE, "ru"));

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(store.snapshot().get_string(keys::APP_LANGUAGE).is_none());
    }
}
