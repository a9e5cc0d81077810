//! Effective settings for a run
//!
//! Merges command-line overrides over the file configuration and validates
//! the result once, so the rest of the crate only sees checked values.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use super::config::Config;
use super::error::{ConfigError, Result};
use crate::duration::parse_duration;
use crate::filter::Filters;
use crate::sql::ConnectionSettings;
use crate::traversal::{DEFAULT_EXECUTION_TIMEOUT, DEFAULT_MAX_TRIES, ExecutionParameters};

/// Values supplied on the command line. `None` and empty lists defer to the
/// file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub subscriptions: Vec<String>,
    pub server_names: Vec<String>,
    pub database_names: Vec<String>,
    pub interactive: bool,
    pub dry_run: bool,
    pub max_tries: Option<u32>,
    pub execution_timeout: Option<Duration>,
    pub procedure_script: Option<PathBuf>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub filters: Filters,
    pub params: ExecutionParameters,
    pub procedure_script: Option<PathBuf>,
    pub management_endpoint: Url,
    pub connection: ConnectionSettings,
}

impl Settings {
    pub fn resolve(config: Config, overrides: Overrides) -> Result<Self> {
        let max_tries = overrides
            .max_tries
            .or(config.max_tries)
            .unwrap_or(DEFAULT_MAX_TRIES);
        if max_tries == 0 {
            return Err(ConfigError::invalid("max_tries", "must be at least 1"));
        }

        let execution_timeout = match overrides.execution_timeout {
            Some(timeout) => timeout,
            None => match config.execution_timeout.as_deref() {
                Some(raw) => parse_duration(raw)
                    .map_err(|message| ConfigError::invalid("execution_timeout", message))?,
                None => DEFAULT_EXECUTION_TIMEOUT,
            },
        };

        if config.azure.connect_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "azure.connect_timeout_secs",
                "must be greater than zero",
            ));
        }

        let management_endpoint = Url::parse(&config.azure.management_endpoint).map_err(|e| {
            ConfigError::invalid("azure.management_endpoint", format!("not a valid URL: {}", e))
        })?;
        if !matches!(management_endpoint.scheme(), "https" | "http") {
            return Err(ConfigError::invalid(
                "azure.management_endpoint",
                "must be an http(s) URL",
            ));
        }

        let filters = Filters::new(
            prefer(overrides.subscriptions, config.subscriptions),
            prefer(overrides.server_names, config.server_names),
            prefer(overrides.database_names, config.database_names),
        );

        Ok(Self {
            filters,
            params: ExecutionParameters {
                max_tries,
                execution_timeout,
                interactive: overrides.interactive || config.interactive,
                dry_run: overrides.dry_run,
            },
            procedure_script: overrides.procedure_script.or(config.procedure_script),
            management_endpoint,
            connection: ConnectionSettings {
                port: config.azure.sql_port,
                connect_timeout: Duration::from_secs(config.azure.connect_timeout_secs),
            },
        })
    }
}

fn prefer(cli: Vec<String>, file: Vec<String>) -> Vec<String> {
    if cli.is_empty() { file } else { cli }
}
