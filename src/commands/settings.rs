use crate::commands::db::DEFAULT_DB_PATH;
use crate::commands::fetcher::{GithubClientConfig, DEFAULT_API_ROOT, DEFAULT_TIMEOUT_SECS};
use crate::error::{LedgerError, Result};
use crate::models::entity::{RepositoryEntry, TrackedEntity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Contents of `config.json`, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
    #[serde(default = "default_api_root")]
    pub api_root: String,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            repositories: Vec::new(),
            api_root: default_api_root(),
            database_path: default_database_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_root() -> String {
    DEFAULT_API_ROOT.to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl LedgerConfig {
    /// Valid entities in configured order. Invalid entries are logged and skipped.
    pub fn tracked_entities(&self) -> Vec<TrackedEntity> {
        self.repositories
            .iter()
            .filter_map(|entry| match entry.validate() {
                Ok(entity) => Some(entity),
                Err(e) => {
                    log::warn!("{e}");
                    None
                }
            })
            .collect()
    }

    /// Fails before any network or database work when a sync cannot proceed.
    pub fn require_sync_ready(&self) -> Result<()> {
        if self.github_token.as_deref().map_or(true, str::is_empty) {
            return Err(LedgerError::Config(format!(
                "github_token missing in config and {TOKEN_ENV_VAR} is not set"
            )));
        }
        if self.repositories.is_empty() {
            return Err(LedgerError::Config("repositories list is empty in config".to_string()));
        }
        Ok(())
    }

    pub fn client_config(&self) -> GithubClientConfig {
        GithubClientConfig {
            api_root: self.api_root.clone(),
            token: self.github_token.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Reads the config file. A missing file is a config error, not a default.
pub fn load_config(path: &Path) -> Result<LedgerConfig> {
    let env_token = std::env::var(TOKEN_ENV_VAR).ok();
    load_config_with_env_token(path, env_token)
}

pub fn load_config_with_env_token(path: &Path, env_token: Option<String>) -> Result<LedgerConfig> {
    if !path.exists() {
        return Err(LedgerError::Config(format!("Config file not found: {}", path.display())));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| LedgerError::Config(format!("Failed to read {}: {e}", path.display())))?;
    let mut config = serde_json::from_str::<LedgerConfig>(&raw)
        .map_err(|e| LedgerError::Config(format!("Failed to parse {}: {e}", path.display())))?;

    sanitize_config(&mut config, env_token);
    Ok(config)
}

fn sanitize_config(config: &mut LedgerConfig, env_token: Option<String>) {
    config.github_token = config
        .github_token
        .take()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| env_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()));

    if config.api_root.trim().is_empty() {
        config.api_root = default_api_root();
    }

    if config.timeout_secs == 0 {
        config.timeout_secs = default_timeout_secs();
    }
}
