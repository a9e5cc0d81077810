//! Configuration file loading
//!
//! The file is optional. A missing file yields the defaults; a present but
//! malformed file is an error.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Names or IDs of subscriptions to work in
    #[serde(default)]
    pub subscriptions: Vec<String>,
    /// Names of servers to work on
    #[serde(default)]
    pub server_names: Vec<String>,
    /// Names of databases to work on
    #[serde(default)]
    pub database_names: Vec<String>,
    /// Allow interactive (browser) authentication
    #[serde(default)]
    pub interactive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u32>,
    /// Same syntax as `--execution-timeout`, e.g. "01:00:00" or "90m"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_timeout: Option<String>,
    /// ALTER script to use instead of the bundled one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_script: Option<PathBuf>,
    #[serde(default)]
    pub azure: AzureConfig,
}

/// Endpoints and connection options
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AzureConfig {
    #[serde(default = "default_management_endpoint")]
    pub management_endpoint: String,
    #[serde(default = "default_sql_port")]
    pub sql_port: u16,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            management_endpoint: default_management_endpoint(),
            sql_port: default_sql_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_management_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_sql_port() -> u16 {
    crate::sql::DEFAULT_SQL_PORT
}

fn default_connect_timeout_secs() -> u64 {
    crate::sql::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, `~/.config/azsqlidxmgr/config.toml` is preferred when it (or
    /// its directory) exists, otherwise the platform path is used.
    ///
    /// On Linux: ~/.config/azsqlidxmgr/config.toml
    /// On Windows: %APPDATA%\azsqlidxmgr\config\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("azsqlidxmgr")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path
                        .parent()
                        .map(|p| p.exists())
                        .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "azsqlidxmgr", "azsqlidxmgr").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports ${VAR} and ${VAR:-default}. Unset variables without a default
    /// are left as written.
    fn expand_env_vars(content: &str) -> String {
        shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok()).to_string()
    }
}
