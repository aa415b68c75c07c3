//! # rw-config
//!
//! Layered settings for the Rusty-Writers binary, lowest priority first:
//! built-in defaults, an optional `rusty-writers.toml`, then `RW_*`
//! environment variables (nested with `__`, e.g. `RW_CRITIC__API_KEY`).
//! A `.env` file is loaded into the environment before anything else.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_FILE: &str = "rusty-writers.toml";
const ENV_PREFIX: &str = "RW";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub critic: CriticSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the persisted document.
    pub data_dir: PathBuf,
    /// Name of the persisted document (the single storage key).
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct CriticSettings {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    api_key: Option<SecretString>,
    /// Upper bound on one review; past it the fallback rating is used.
    pub timeout_secs: u64,
    #[serde(default)]
    pub site_url: Option<String>,
    pub site_name: String,
}

impl CriticSettings {
    /// The API key, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Loads `.env`, then layers defaults, `rusty-writers.toml` and the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        Self::from_sources(Some(Path::new(DEFAULT_FILE)), None)
    }

    /// `env` replaces the process environment when given.
    pub fn from_sources(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("storage.data_dir", "./data")?
            .set_default("storage.key", "aiwriters_db")?
            .set_default("critic.base_url", "https://openrouter.ai/api/v1")?
            .set_default("critic.model", "deepseek/deepseek-chat-v3-0324:free")?
            .set_default("critic.timeout_secs", 60_i64)?
            .set_default("critic.site_name", "AI Writers App")?;

        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file).required(false));
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.critic.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "critic.timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        let key = self.storage.key.trim();
        if key.is_empty() || key.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                key: "storage.key",
                reason: format!("{:?} is not a plain file name", self.storage.key),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
