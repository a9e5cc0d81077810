//! Error types for azsqlidxmgr
//!
//! Maps core failures onto user-facing errors with suggestions, printed as a
//! cargo-style diagnostic.

use azsqlidxmgr_core::{ConfigError, CoreError};
use colored::Colorize;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Authentication failed: no credential available
///
///   tip: sign in with the Azure CLI first:
///       az login
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the azsqlidxmgr application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Azure Resource Manager error: {message}")]
    ResourceManager { status: Option<u16>, message: String },

    #[error("Database '{server}/{database}' failed: {message}")]
    Database {
        server: String,
        database: String,
        message: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for azsqlidxmgr operations
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<(String, Vec<String>)> {
        match self {
            AppError::Config(_) => vec![
                (
                    "Check the configuration file syntax".to_string(),
                    vec![],
                ),
                (
                    "Or point to a different file:".to_string(),
                    vec!["azsqlidxmgr --config-file ./config.toml".to_string()],
                ),
            ],
            AppError::AuthenticationFailed { .. } => vec![
                (
                    "Sign in with the Azure CLI first:".to_string(),
                    vec!["az login".to_string()],
                ),
                (
                    "Or let the tool sign you in:".to_string(),
                    vec!["azsqlidxmgr --interactive".to_string()],
                ),
            ],
            AppError::ResourceManager {
                status: Some(401 | 403),
                ..
            } => vec![(
                "Ensure your identity has Reader access to the subscription".to_string(),
                vec!["az account show".to_string()],
            )],
            AppError::ResourceManager { .. } => vec![(
                "Check network connectivity to the management endpoint".to_string(),
                vec![],
            )],
            AppError::Database { .. } => vec![
                (
                    "Check the procedure script for errors".to_string(),
                    vec![],
                ),
                (
                    "Or name only the databases to maintain, leaving the failing one out:"
                        .to_string(),
                    vec![
                        "azsqlidxmgr --database-name <keep-1> --database-name <keep-2>"
                            .to_string(),
                    ],
                ),
            ],
            AppError::InvalidInput { .. } => vec![(
                "Check the command syntax:".to_string(),
                vec!["azsqlidxmgr --help".to_string()],
            )],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        if let AppError::Database { .. } = self {
            diag = diag.detail("The run was aborted; databases after this one were not processed.");
        }

        for (description, commands) in self.suggestions() {
            let commands: Vec<&str> = commands.iter().map(String::as_str).collect();
            diag = diag.tip(&description, &commands);
        }

        diag.print();
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::OutputError {
            message: format!("{:#}", err),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Cancelled => AppError::Cancelled,
            CoreError::Credential(message) => AppError::AuthenticationFailed { message },
            CoreError::Config(e) => AppError::Config(e),
            CoreError::Validation(message) => AppError::InvalidInput { message },
            CoreError::ResourceManager { status, message } => AppError::ResourceManager {
                status: Some(status),
                message,
            },
            CoreError::Http(e) => AppError::ResourceManager {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            CoreError::Decode(e) => AppError::ResourceManager {
                status: None,
                message: e.to_string(),
            },
            CoreError::Sql {
                server,
                database,
                source,
            } => AppError::Database {
                server,
                database,
                message: source.to_string(),
            },
        }
    }
}
