//! Maintenance of a single database
//!
//! One invocation opens one connection and runs three batches in order:
//! create-if-missing, alter, execute. The connection is closed on every path
//! before returning, including cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SqlError;
use crate::model::{Database, Server};
use crate::script::{CREATE_PROCEDURE_SQL, EXECUTE_PROCEDURE_SQL, ProcedureScript};
use crate::sql::{ConnectionSettings, ConnectionTarget, SqlConnector, SqlSession};

/// Timeout for the create and alter batches
pub const SETUP_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the maintenance procedure against one database at a time
#[derive(Clone)]
pub struct MaintenanceExecutor {
    connector: Arc<dyn SqlConnector>,
    script: Arc<ProcedureScript>,
    settings: ConnectionSettings,
}

fn suffix(dry_run: bool) -> &'static str {
    if dry_run { " (dry run)" } else { "" }
}

impl MaintenanceExecutor {
    pub fn new(
        connector: Arc<dyn SqlConnector>,
        script: Arc<ProcedureScript>,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            connector,
            script,
            settings,
        }
    }

    /// Ensure the procedure exists, apply the current definition, then run it.
    ///
    /// `execution_timeout` bounds the final execute batch; the setup batches use
    /// [`SETUP_BATCH_TIMEOUT`]. In dry-run mode nothing is opened or executed.
    /// When `cancel` fires the in-flight work is abandoned and
    /// [`SqlError::cancelled`] is returned.
    pub async fn run(
        &self,
        server: &Server,
        database: &Database,
        execution_timeout: Duration,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<(), SqlError> {
        info!(
            "Beginning index rebuild '{}/{}' ...",
            server.name, database.name
        );

        let target = ConnectionTarget::new(server, database, self.settings);
        debug!(
            "Creating and opening database connection for '{}/{}'{}: {}",
            server.name,
            database.name,
            suffix(dry_run),
            target.connection_string()
        );

        if dry_run {
            for phase in ["create if not exists script", "alter script", "stored procedure"] {
                debug!(
                    "Executing {} for '{}/{}'{}",
                    phase,
                    server.name,
                    database.name,
                    suffix(dry_run)
                );
                debug!(
                    "Completed {} for '{}/{}'{}",
                    phase,
                    server.name,
                    database.name,
                    suffix(dry_run)
                );
            }
        } else {
            let mut session = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SqlError::cancelled()),
                session = self.connector.connect(&target) => session?,
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(SqlError::cancelled()),
                result = self.run_statements(session.as_mut(), server, database, execution_timeout) => result,
            };

            match (result, session.close().await) {
                (Err(e), Err(close_err)) => {
                    debug!(
                        "Closing connection to '{}/{}' after failure also failed: {}",
                        server.name, database.name, close_err
                    );
                    return Err(e);
                }
                (Err(e), Ok(())) => return Err(e),
                (Ok(()), Err(close_err)) => {
                    warn!(
                        "Failed to close connection to '{}/{}': {}",
                        server.name, database.name, close_err
                    );
                }
                (Ok(()), Ok(())) => {}
            }
        }

        info!(
            "Maintenance of database indexes completed for '{}/{}'",
            server.name, database.name
        );
        Ok(())
    }

    async fn run_statements(
        &self,
        session: &mut dyn SqlSession,
        server: &Server,
        database: &Database,
        execution_timeout: Duration,
    ) -> Result<(), SqlError> {
        let batches: [(&str, &str, Duration); 3] = [
            (
                "create if not exists script",
                CREATE_PROCEDURE_SQL,
                SETUP_BATCH_TIMEOUT,
            ),
            ("alter script", self.script.alter_sql(), SETUP_BATCH_TIMEOUT),
            ("stored procedure", EXECUTE_PROCEDURE_SQL, execution_timeout),
        ];

        for (phase, sql, timeout) in batches {
            debug!(
                "Executing {} for '{}/{}'",
                phase, server.name, database.name
            );
            session.execute(sql, Some(timeout)).await?;
            debug!(
                "Completed {} for '{}/{}'",
                phase, server.name, database.name
            );
        }

        Ok(())
    }
}
