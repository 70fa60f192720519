use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ClientError, Result};

/// Backend used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

pub const API_URL_ENV: &str = "LAYA_API_URL";
pub const API_TOKEN_ENV: &str = "LAYA_API_TOKEN";

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_TOP_K: u32 = 4;
pub const DEFAULT_ERROR_PREFIX: &str = "Error: ";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub search_limit: Option<usize>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub error_prefix: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        config_path_in(dirs::config_dir())
    }

    /// Backend base URL: environment first, then the config file, then the local default.
    pub fn api_url(&self) -> String {
        resolve_api_url(std::env::var(API_URL_ENV).ok(), self.api_url.as_deref())
    }

    pub fn api_token(&self) -> Option<String> {
        std::env::var(API_TOKEN_ENV)
            .ok()
            .or_else(|| self.token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    pub fn top_k(&self) -> u32 {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    pub fn error_prefix(&self) -> String {
        self.error_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_ERROR_PREFIX.to_string())
    }
}

pub fn resolve_api_url(from_env: Option<String>, from_file: Option<&str>) -> String {
    let configured = from_env
        .filter(|u| !u.trim().is_empty())
        .or_else(|| from_file.map(str::to_string).filter(|u| !u.trim().is_empty()));

    match configured {
        Some(url) => normalize_base_url(&url),
        None => {
            tracing::warn!(
                "{} is not set and no api_url is configured; falling back to {}",
                API_URL_ENV,
                DEFAULT_API_URL
            );
            DEFAULT_API_URL.to_string()
        }
    }
}

pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn config_path_in(config_dir: Option<PathBuf>) -> Result<PathBuf> {
    let config_dir = config_dir.ok_or_else(|| {
        ClientError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "could not determine config directory",
        ))
    })?;
    Ok(config_dir.join("laya").join("config.json"))
}

/// Default directory for persisted UI state (theme, last query, transcript).
pub fn default_state_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("laya"))
}
