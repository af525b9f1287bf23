//! Layered configuration: built-in defaults, then `diary.toml`, then `DIARY_*` env vars.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::MAX_SIMULATED_LATENCY;

pub const DEFAULT_CONFIG_FILE: &str = "diary.toml";
pub const ENV_PREFIX: &str = "DIARY_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the whole entry collection.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: PathBuf::from("diary_entries.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Heuristic,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Artificial delay of the heuristic engine, in milliseconds.
    pub simulated_latency_ms: u64,
    pub remote: RemoteConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            kind: EngineKind::Heuristic,
            simulated_latency_ms: 1500,
            remote: RemoteConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Messages endpoint, e.g. `https://api.anthropic.com/v1/messages`.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            endpoint: String::new(),
            api_key: String::new(),
            model: "claude-3-sonnet-20240229".to_string(),
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            directory: PathBuf::from("."),
            filter: "info".to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads from `diary.toml` in the working directory, if present.
    pub fn load() -> Result<AppConfig, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        if config.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingStoragePath);
        }

        let max_ms = MAX_SIMULATED_LATENCY.as_millis() as u64;
        if config.engine.simulated_latency_ms > max_ms {
            return Err(ConfigError::LatencyTooHigh {
                value: config.engine.simulated_latency_ms,
                max: max_ms,
            });
        }

        if config.engine.remote.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }

        if config.engine.remote.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),

    #[error("storage path is not configured")]
    MissingStoragePath,

    #[error("simulated latency {value}ms exceeds the {max}ms bound")]
    LatencyTooHigh { value: u64, max: u64 },

    #[error("remote max_tokens must be greater than 0")]
    InvalidMaxTokens,

    #[error("remote timeout must be greater than 0 seconds")]
    InvalidTimeout,
}
