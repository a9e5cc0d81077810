//! # azsqlidxmgr-core
//!
//! Engine behind the `azsqlidxmgr` CLI. Walks every accessible subscription,
//! SQL server and database, and keeps the `AzureSQLMaintenance` stored
//! procedure installed and executed on each primary user database.
//!
//! ## Layout
//!
//! - [`traversal`] drives the walk and builds the [`RunSummary`]
//! - [`filter`] decides which subscriptions, servers and databases qualify
//! - [`executor`] creates, alters and executes the procedure on one database
//! - [`retry`] repeats an attempt while it keeps timing out
//! - [`resources`] and [`sql`] are the seams for enumeration and SQL access;
//!   [`azure`] implements them against ARM and TDS
//! - [`config`] loads the optional config file and resolves [`Settings`]
//!
//! Traversal is strictly sequential. At most one database connection is open
//! at any time.

pub mod azure;
pub mod config;
pub mod duration;
pub mod error;
pub mod executor;
pub mod filter;
pub mod model;
pub mod resources;
pub mod retry;
pub mod script;
pub mod sql;
pub mod summary;
pub mod traversal;

pub use config::{Config, ConfigError, Overrides, Settings};
pub use error::{CoreError, Result, SqlError, SqlErrorKind};
pub use executor::MaintenanceExecutor;
pub use filter::{DatabaseDecision, Filters};
pub use model::{Database, ReplicationLink, ReplicationRole, Server, Subscription};
pub use resources::{ResourceProvider, ResourceStream};
pub use retry::{RetryController, RetryOutcome};
pub use script::ProcedureScript;
pub use sql::{ConnectionSettings, ConnectionTarget, SqlConnector, SqlSession};
pub use summary::{DatabaseOutcome, DatabaseReport, RunSummary, SkipCounts};
pub use traversal::{ExecutionParameters, MaintenanceRunner};
