use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where the application keeps its files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub package_name: String,
    pub version_name: String,
    pub files_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            package_name: "com.scmv.android".to_string(),
            version_name: "1.0".to_string(),
            files_dir: PathBuf::from("data/files"),
            cache_dir: PathBuf::from("data/cache"),
        }
    }
}

/// Process wide application context - the root value the object graph is built from
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ContextConfig,
}

impl AppContext {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn package_name(&self) -> &str {
        &self.config.package_name
    }

    pub fn version_name(&self) -> &str {
        &self.config.version_name
    }

    pub fn files_dir(&self) -> &Path {
        &self.config.files_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    /// File backing the preference store
    pub fn preferences_path(&self) -> PathBuf {
        self.config.files_dir.join("datastore").join("scmv_preferences.json")
    }

    /// Sent with outgoing requests, `<package>/<version>`
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.config.package_name, self.config.version_name)
    }
}
