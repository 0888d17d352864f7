use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Backend root including any prefix, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

/// Where orphan cleanup runs.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CleanupMode {
    /// Delete orphans one by one from this client, reporting each failure.
    #[default]
    Client,
    /// Ask the backend to run its own cleanup endpoint.
    Server,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SyncConfig {
    /// Provider used when a command is given no `--provider`.
    #[serde(default)]
    pub default_provider: Option<i64>,
    #[serde(default)]
    pub cleanup: CleanupMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Defaults used when no config file exists: a backend on localhost.
    pub fn minimal() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                timeout_secs: default_timeout_secs(),
            },
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let base = config.api.base_url.trim();
    if base.is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        anyhow::bail!(
            "api.base_url must start with http:// or https://, got '{}'",
            base
        );
    }

    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }

    if let Some(id) = config.sync.default_provider {
        if id < 1 {
            anyhow::bail!("sync.default_provider must be a positive id, got {}", id);
        }
    }

    match config.logging.level.to_ascii_lowercase().as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => {}
        other => anyhow::bail!(
            "Unknown logging.level: '{}'. Must be error, warn, info, debug, or trace.",
            other
        ),
    }

    Ok(())
}
