//! Configuration loading
//!
//! Sources are merged in this order, later ones override earlier ones:
//! 1. Defaults from [ScmvConfig::default]
//! 2. The TOML file, `scmv.toml` unless another path is given
//! 3. Environment variables prefixed with `SCMV__`, nested keys split by `__`
//!    (e.g. `SCMV__WS__URL`)

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use scmv_config::{errors::ConfigError, ConfigProvider};
use serde::{Deserialize, Serialize};

use crate::{
    context::ContextConfig,
    data::{
        json::JsonCodecConfig,
        remote::{HttpClientConfig, WsClientConfig},
    },
};

pub const DEFAULT_CONFIG_FILE: &str = "scmv.toml";
pub const ENV_PREFIX: &str = "SCMV__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScmvConfig {
    pub logging: LoggingConfig,
    pub context: ContextConfig,
    pub http: HttpClientConfig,
    pub ws: WsClientConfig,
    pub json: JsonCodecConfig,
}

impl ScmvConfig {
    /// Registers the sections factories read through `Config<T>`
    pub fn config_provider(&self) -> Result<ConfigProvider, ConfigError> {
        let mut provider = ConfigProvider::new();
        provider
            .add_config(self.http.clone())?
            .add_config(self.ws.clone())?
            .add_config(self.json.clone())?;
        Ok(provider)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn load(&self) -> Result<ScmvConfig, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(ScmvConfig::default()));

        let path = self
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if path.exists() {
            figment = figment.merge(Toml::file(&path));
        } else if self.config_path.is_some() {
            // An explicitly requested file must exist
            return Err(figment::Error::from(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        figment
            .merge(Env::prefixed(&self.env_prefix).split("__"))
            .extract()
    }
}
