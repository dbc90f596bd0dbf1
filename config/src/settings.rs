//! Typed settings: file layer + env overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default agent model when neither env nor file sets one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Error loading or parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// TOML file shape; every field optional so partial files work.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    openrouter_api_key: Option<String>,
    openrouter_base_url: Option<String>,
    crm_base_url: Option<String>,
    crm_token: Option<String>,
    model: Option<String>,
    database_path: Option<String>,
    bind_addr: Option<String>,
    compression_max_tokens: Option<u32>,
}

/// Resolved settings for the agent, server, and CLI.
///
/// **Interaction**: Built once at startup by `cli`/`serve`; the core takes
/// plain values (keys, URLs, model) rather than this struct.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    pub crm_base_url: String,
    pub crm_token: String,
    pub model: String,
    pub database_path: String,
    pub bind_addr: String,
    pub compression_max_tokens: u32,
}

impl Settings {
    /// Loads settings from `~/.cadenza/config.toml` (when present) with env
    /// overrides. `OPENROUTER_API_KEY` and `CRM_TOKEN` are required.
    pub fn load() -> Result<Self, ConfigError> {
        let file = default_config_path()
            .filter(|p| p.exists())
            .map(|p| read_file(&p))
            .transpose()?
            .unwrap_or_default();
        Self::from_layers(file)
    }

    /// Loads settings from an explicit TOML file path with env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = read_file(path.as_ref())?;
        Self::from_layers(file)
    }

    fn from_layers(file: FileSettings) -> Result<Self, ConfigError> {
        let openrouter_api_key = env_or("OPENROUTER_API_KEY", file.openrouter_api_key)
            .ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;
        let crm_token =
            env_or("CRM_TOKEN", file.crm_token).ok_or(ConfigError::Missing("CRM_TOKEN"))?;
        Ok(Self {
            openrouter_api_key,
            crm_token,
            openrouter_base_url: env_or("OPENROUTER_BASE_URL", file.openrouter_base_url)
                .unwrap_or_else(|| "https://openrouter.ai/api/v1".to_string()),
            crm_base_url: env_or("CRM_BASE_URL", file.crm_base_url)
                .unwrap_or_else(|| "https://app.clodura.ai".to_string()),
            model: env_or("CADENZA_MODEL", file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            database_path: env_or("CADENZA_DB", file.database_path)
                .unwrap_or_else(|| "cadenza.db".to_string()),
            bind_addr: env_or("CADENZA_ADDR", file.bind_addr)
                .unwrap_or_else(|| "127.0.0.1:8000".to_string()),
            compression_max_tokens: std::env::var("CADENZA_COMPRESSION_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(file.compression_max_tokens)
                .unwrap_or(40_000),
        })
    }
}

fn env_or(key: &str, file_value: Option<String>) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty()).or(file_value)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".cadenza").join("config.toml"))
}

fn read_file(path: &Path) -> Result<FileSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
