//! SQL connection seam
//!
//! The executor talks to databases through [`SqlConnector`] and [`SqlSession`]
//! so tests can substitute an in-memory implementation. The production
//! implementation lives in [`crate::azure::mssql`].

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SqlError;
use crate::model::{Database, Server};

/// Default SQL Server port
pub const DEFAULT_SQL_PORT: u16 = 1433;

/// Default time allowed to establish a connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authentication mode used for every database connection
pub const AUTHENTICATION_MODE: &str = "Active Directory Default";

/// Connection settings shared by every database in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub port: u16,
    pub connect_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SQL_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Everything needed to open a connection to one database
///
/// Security options are fixed: credentials are not persisted, multiple
/// active result sets are off, encryption is required and the server
/// certificate is always validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub connect_timeout: Duration,
}

impl ConnectionTarget {
    pub fn new(server: &Server, database: &Database, settings: ConnectionSettings) -> Self {
        Self {
            host: server.fully_qualified_domain_name.clone(),
            port: settings.port,
            database: database.name.clone(),
            connect_timeout: settings.connect_timeout,
        }
    }

    /// Render as an ADO.NET style connection string.
    ///
    /// Contains no secrets; the token is supplied at connect time.
    pub fn connection_string(&self) -> String {
        format!(
            "Server={},{};Database={};Authentication={};Persist Security Info=False;\
             MultipleActiveResultSets=False;Encrypt=True;TrustServerCertificate=False;\
             Connection Timeout={};",
            self.host,
            self.port,
            self.database,
            AUTHENTICATION_MODE,
            self.connect_timeout.as_secs()
        )
    }
}

/// Opens sessions against a [`ConnectionTarget`]
#[async_trait]
pub trait SqlConnector: Send + Sync {
    async fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn SqlSession>, SqlError>;
}

/// An open connection to one database
#[async_trait]
pub trait SqlSession: Send {
    /// Execute a batch that returns no rows. `timeout` bounds the whole
    /// batch; `None` waits indefinitely.
    async fn execute(&mut self, sql: &str, timeout: Option<Duration>) -> Result<(), SqlError>;

    /// Close the connection
    async fn close(self: Box<Self>) -> Result<(), SqlError>;
}
