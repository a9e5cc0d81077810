//! Unified error handling for azsqlidxmgr-core
//!
//! SQL failures are carried as [`SqlError`] and classified into a small closed
//! set of [`SqlErrorKind`]s. Retry and skip policy only ever look at the kind,
//! never at driver-specific representations.
//!
//! # Example
//!
//! ```rust
//! use azsqlidxmgr_core::{SqlError, SqlErrorKind};
//!
//! let err = SqlError::new(Some(40615), "Cannot open server requested by the login");
//! assert_eq!(err.kind(), SqlErrorKind::IpBlocked);
//! assert!(err.is_skippable());
//! assert!(!err.is_retryable());
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Client-side timeout, as reported by SQL client libraries.
pub const TIMEOUT_CODE: i32 = -2;
/// Timeout code as matched historically by this tool.
pub const LEGACY_TIMEOUT_CODE: i32 = 2;
/// Client IP address is not allowed by the server firewall.
pub const IP_NOT_ALLOWED_CODE: i32 = 40615;
/// Login failed for the principal.
pub const LOGIN_FAILED_CODE: i32 = 18456;
/// Database is read-only or the principal lacks permission to write.
pub const READ_ONLY_CODE: i32 = 3906;

/// Classification of a SQL failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlErrorKind {
    /// Operation timed out; worth another attempt
    TransientTimeout,
    /// Network ACL rejected the connection
    IpBlocked,
    /// Authentication or authorization rejected the login
    LoginFailed,
    /// Write rejected: read-only database or missing permission
    ReadOnlyOrForbidden,
    /// The run was cancelled while the operation was in flight
    Cancelled,
    /// Anything else
    Other,
}

impl SqlErrorKind {
    /// Classify a numeric server/client error code
    pub fn from_code(code: i32) -> Self {
        match code {
            TIMEOUT_CODE | LEGACY_TIMEOUT_CODE => SqlErrorKind::TransientTimeout,
            IP_NOT_ALLOWED_CODE => SqlErrorKind::IpBlocked,
            LOGIN_FAILED_CODE => SqlErrorKind::LoginFailed,
            READ_ONLY_CODE => SqlErrorKind::ReadOnlyOrForbidden,
            _ => SqlErrorKind::Other,
        }
    }
}

impl fmt::Display for SqlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlErrorKind::TransientTimeout => write!(f, "timeout"),
            SqlErrorKind::IpBlocked => write!(f, "ip-blocked"),
            SqlErrorKind::LoginFailed => write!(f, "login-failed"),
            SqlErrorKind::ReadOnlyOrForbidden => write!(f, "read-only-or-forbidden"),
            SqlErrorKind::Cancelled => write!(f, "cancelled"),
            SqlErrorKind::Other => write!(f, "other"),
        }
    }
}

/// A failure reported by the SQL client or server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlError {
    code: Option<i32>,
    message: String,
    cancelled: bool,
}

impl SqlError {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cancelled: false,
        }
    }

    /// The operation was abandoned because cancellation was requested
    pub fn cancelled() -> Self {
        Self {
            code: None,
            message: "Operation cancelled".to_string(),
            cancelled: true,
        }
    }

    /// A client-side timeout after waiting `after`
    pub fn timed_out(after: Duration) -> Self {
        Self::new(
            Some(TIMEOUT_CODE),
            format!("Execution timeout expired after {:?}", after),
        )
    }

    /// A client-side failure without a server error number
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn kind(&self) -> SqlErrorKind {
        if self.cancelled {
            return SqlErrorKind::Cancelled;
        }
        self.code
            .map(SqlErrorKind::from_code)
            .unwrap_or(SqlErrorKind::Other)
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind() == SqlErrorKind::TransientTimeout
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Returns true if the operation may succeed when attempted again
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_timeout()
    }

    /// Returns true if the failure is environmental to one database and the
    /// traversal should carry on with the next one
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(
            self.kind(),
            SqlErrorKind::IpBlocked
                | SqlErrorKind::LoginFailed
                | SqlErrorKind::ReadOnlyOrForbidden
        )
    }
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "SQL error {}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for SqlError {}

impl From<tiberius::error::Error> for SqlError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => {
                SqlError::new(Some(token.code() as i32), token.message())
            }
            other => SqlError::client(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SqlError {
    fn from(err: std::io::Error) -> Self {
        SqlError::client(format!("IO error: {}", err))
    }
}

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Resource manager answered with a non-success status
    #[error("Resource manager request failed with status {status}: {message}")]
    ResourceManager { status: u16, message: String },

    /// Transport failure talking to the resource manager
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource manager response could not be decoded
    #[error("Failed to decode resource manager response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Token acquisition failed
    #[error("Credential error: {0}")]
    Credential(String),

    /// Unhandled SQL failure on a specific database
    #[error("SQL failure on '{server}/{database}': {source}")]
    Sql {
        server: String,
        database: String,
        #[source]
        source: SqlError,
    },

    /// Cancellation was requested
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid input or settings
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns true if the run was aborted by cancellation
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }

    /// Returns true if this is an authentication/authorization error
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            CoreError::Credential(_) => true,
            CoreError::ResourceManager { status, .. } => *status == 401 || *status == 403,
            CoreError::Sql { source, .. } => source.kind() == SqlErrorKind::LoginFailed,
            _ => false,
        }
    }

    /// The SQL classification, when this wraps a SQL failure
    pub fn sql_kind(&self) -> Option<SqlErrorKind> {
        match self {
            CoreError::Sql { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
