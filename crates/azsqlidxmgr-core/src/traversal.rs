//! Subscription → server → database traversal
//!
//! Depth-first and strictly sequential: one database is fully processed,
//! connection closed, before the next is considered. Cancellation is checked
//! at every loop boundary, never in the middle of a statement.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result, SqlErrorKind};
use crate::executor::MaintenanceExecutor;
use crate::filter::Filters;
use crate::model::{Database, Server, Subscription};
use crate::resources::ResourceProvider;
use crate::retry::{RetryController, RetryOutcome};
use crate::summary::{DatabaseOutcome, DatabaseReport, RunSummary};

/// Default number of attempts per database
pub const DEFAULT_MAX_TRIES: u32 = 6;

/// Default timeout for executing the maintenance procedure
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Knobs for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionParameters {
    pub max_tries: u32,
    pub execution_timeout: Duration,
    /// Allow interactive (browser) authentication
    pub interactive: bool,
    /// Log what would be done without touching any database
    pub dry_run: bool,
}

impl Default for ExecutionParameters {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
            interactive: false,
            dry_run: false,
        }
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }
    Ok(())
}

/// Walks every subscription and runs maintenance on eligible databases
pub struct MaintenanceRunner {
    provider: Arc<dyn ResourceProvider>,
    executor: MaintenanceExecutor,
    filters: Filters,
    params: ExecutionParameters,
    retry: RetryController,
}

impl MaintenanceRunner {
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        executor: MaintenanceExecutor,
        filters: Filters,
        params: ExecutionParameters,
    ) -> Result<Self> {
        let retry = RetryController::new(params.max_tries)?;
        Ok(Self {
            provider,
            executor,
            filters,
            params,
            retry,
        })
    }

    /// Run the full traversal.
    ///
    /// Returns the summary once every subscription has been walked. Fails on
    /// cancellation, on enumeration errors, and on any SQL failure that is not
    /// a timeout, blocked IP, failed login or read-only rejection.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary> {
        let mut summary = RunSummary::new(self.params.dry_run);

        info!("Fetching subscriptions ...");
        let mut subscriptions = self.provider.subscriptions();
        while let Some(subscription) = subscriptions.try_next().await? {
            ensure_not_cancelled(cancel)?;

            // display name only, subscription IDs stay out of the logs
            if !self.filters.includes_subscription(&subscription) {
                debug!(
                    "Skipping subscription '{}' ...",
                    subscription.display_name
                );
                summary.subscriptions_skipped += 1;
                continue;
            }

            info!("Working in {}", subscription.display_name);
            summary.subscriptions_visited += 1;

            let mut servers = self.provider.servers(&subscription);
            while let Some(server) = servers.try_next().await? {
                ensure_not_cancelled(cancel)?;

                if !self.filters.includes_server(&server) {
                    debug!("Skipping server '{}' ...", server.name);
                    summary.servers_skipped += 1;
                    continue;
                }

                info!("Beginning maintenance for databases in '{}'.", server.name);
                summary.servers_visited += 1;

                self.process_server(&subscription, &server, cancel, &mut summary)
                    .await?;

                info!("Maintenance for databases in '{}' completed", server.name);
            }
        }

        ensure_not_cancelled(cancel)?;
        info!("Finished");
        Ok(summary)
    }

    async fn process_server(
        &self,
        subscription: &Subscription,
        server: &Server,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut databases = self.provider.databases(server);
        while let Some(database) = databases.try_next().await? {
            ensure_not_cancelled(cancel)?;

            let links: Vec<_> = self
                .provider
                .replication_links(&database)
                .try_collect()
                .await?;

            let decision = self.filters.evaluate_database(&database, &links);
            if !decision.is_included() {
                debug!(
                    "Skipping database '{}/{}' ({:?})",
                    server.name, database.name, decision
                );
                summary.databases_skipped.record(decision);
                continue;
            }

            let (outcome, attempts) = self
                .process_database(server, &database, cancel)
                .await?;
            summary.databases.push(DatabaseReport {
                subscription: subscription.display_name.clone(),
                server: server.name.clone(),
                database: database.name.clone(),
                outcome,
                attempts,
            });
        }

        Ok(())
    }

    async fn process_database(
        &self,
        server: &Server,
        database: &Database,
        cancel: &CancellationToken,
    ) -> Result<(DatabaseOutcome, u32)> {
        let label = format!("{}/{}", server.name, database.name);
        let attempts = AtomicU32::new(0);
        let timeout = self.params.execution_timeout;
        let dry_run = self.params.dry_run;

        let result = self
            .retry
            .run(&label, cancel, |attempt| {
                attempts.store(attempt, Ordering::Relaxed);
                self.executor.run(server, database, timeout, dry_run, cancel)
            })
            .await;

        match result {
            Ok(outcome) => {
                if let RetryOutcome::Exhausted { attempts } = outcome {
                    warn!(
                        "Giving up on '{}' after {} timed out attempt(s).",
                        label, attempts
                    );
                }
                Ok((DatabaseOutcome::from_retry(outcome, dry_run), outcome.attempts()))
            }
            Err(e) if e.is_cancelled() => Err(CoreError::Cancelled),
            Err(e) => {
                let Some(outcome) = DatabaseOutcome::from_skipped(e.kind()) else {
                    return Err(CoreError::Sql {
                        server: server.name.clone(),
                        database: database.name.clone(),
                        source: e,
                    });
                };

                match e.kind() {
                    SqlErrorKind::IpBlocked => warn!(
                        "Connection to '{}' failed because the current IP is not allowed.",
                        server.name
                    ),
                    SqlErrorKind::LoginFailed => warn!(
                        "Login to '{}' failed because the user is not allowed.",
                        label
                    ),
                    _ => warn!(
                        "Database '{}' cannot be updated because the user does not have permissions to or the database is read-only.",
                        label
                    ),
                }
                Ok((outcome, attempts.load(Ordering::Relaxed)))
            }
        }
    }
}
