//! Azure-backed implementations of the resource and SQL seams

pub mod arm;
pub mod credential;
pub mod mssql;

pub use arm::ArmClient;
pub use credential::{AzureCredential, SQL_SCOPE, TokenSource, management_scope};
pub use mssql::TiberiusConnector;
