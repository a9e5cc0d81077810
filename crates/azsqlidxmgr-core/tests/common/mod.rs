//! In-memory fakes for the resource and SQL seams

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use azsqlidxmgr_core::{
    ConnectionSettings, ConnectionTarget, CoreError, Database, ExecutionParameters, Filters,
    MaintenanceExecutor, MaintenanceRunner, ProcedureScript, ReplicationLink, ReplicationRole,
    ResourceProvider, ResourceStream, Server, SqlConnector, SqlError, SqlSession, Subscription,
};

pub fn subscription(id: &str, name: &str) -> Subscription {
    Subscription {
        id: id.to_string(),
        display_name: name.to_string(),
    }
}

pub fn server(name: &str) -> Server {
    Server {
        id: format!("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Sql/servers/{}", name),
        name: name.to_string(),
        fully_qualified_domain_name: format!("{}.database.windows.net", name),
    }
}

pub fn database(server: &Server, name: &str) -> Database {
    Database {
        id: format!("{}/databases/{}", server.id, name),
        name: name.to_string(),
    }
}

pub fn link(role: &str) -> ReplicationLink {
    ReplicationLink {
        name: format!("link-{}", role.to_lowercase()),
        role: ReplicationRole::parse(Some(role)),
    }
}

/// Static resource tree
#[derive(Default)]
pub struct FakeProvider {
    subscriptions: Vec<Subscription>,
    servers: HashMap<String, Vec<Server>>,
    databases: HashMap<String, Vec<Database>>,
    links: HashMap<String, Vec<ReplicationLink>>,
    failing_servers: HashMap<String, u16>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(mut self, subscription: Subscription, servers: Vec<Server>) -> Self {
        self.servers.insert(subscription.id.clone(), servers);
        self.subscriptions.push(subscription);
        self
    }

    pub fn with_databases(mut self, server: &Server, databases: Vec<Database>) -> Self {
        self.databases.insert(server.id.clone(), databases);
        self
    }

    pub fn with_links(mut self, database: &Database, links: Vec<ReplicationLink>) -> Self {
        self.links.insert(database.id.clone(), links);
        self
    }

    /// Listing servers for this subscription fails with the given status
    pub fn failing_servers(mut self, subscription_id: &str, status: u16) -> Self {
        self.failing_servers
            .insert(subscription_id.to_string(), status);
        self
    }
}

fn listed<'a, T: Clone + Send + 'a>(items: Option<&Vec<T>>) -> ResourceStream<'a, T> {
    let items = items.cloned().unwrap_or_default();
    stream::iter(items.into_iter().map(Ok)).boxed()
}

impl ResourceProvider for FakeProvider {
    fn subscriptions(&self) -> ResourceStream<'_, Subscription> {
        listed(Some(&self.subscriptions))
    }

    fn servers<'a>(&'a self, subscription: &'a Subscription) -> ResourceStream<'a, Server> {
        if let Some(status) = self.failing_servers.get(&subscription.id) {
            let err = CoreError::ResourceManager {
                status: *status,
                message: "listing failed".to_string(),
            };
            return stream::once(async move { Err(err) }).boxed();
        }
        listed(self.servers.get(&subscription.id))
    }

    fn databases<'a>(&'a self, server: &'a Server) -> ResourceStream<'a, Database> {
        listed(self.databases.get(&server.id))
    }

    fn replication_links<'a>(
        &'a self,
        database: &'a Database,
    ) -> ResourceStream<'a, ReplicationLink> {
        listed(self.links.get(&database.id))
    }
}

/// What the fake connector saw
#[derive(Default)]
pub struct SqlLog {
    /// `server/database` per opened connection
    pub connects: Vec<String>,
    /// `server/database` per executed batch
    pub statements: Vec<String>,
    pub closes: u32,
}

/// Connector whose failures are scripted per database name
#[derive(Default)]
pub struct FakeConnector {
    pub log: Arc<Mutex<SqlLog>>,
    connect_failures: Mutex<HashMap<String, SqlError>>,
    execute_failures: Arc<Mutex<HashMap<String, VecDeque<SqlError>>>>,
    hanging: Mutex<HashSet<String>>,
    cancel_after: Mutex<Option<(String, CancellationToken)>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connecting to `database` fails with `code`
    pub fn fail_connect(self, database: &str, code: i32) -> Self {
        self.connect_failures.lock().unwrap().insert(
            database.to_string(),
            SqlError::new(Some(code), format!("connect failed with {}", code)),
        );
        self
    }

    /// The execute batch on `database` fails once per queued error
    pub fn fail_execute(self, database: &str, errors: Vec<SqlError>) -> Self {
        self.execute_failures
            .lock()
            .unwrap()
            .insert(database.to_string(), errors.into());
        self
    }

    /// The execute batch on `database` never completes
    pub fn hang_execute(self, database: &str) -> Self {
        self.hanging.lock().unwrap().insert(database.to_string());
        self
    }

    /// Trigger `token` once `database` has been processed
    pub fn cancel_after(self, database: &str, token: CancellationToken) -> Self {
        *self.cancel_after.lock().unwrap() = Some((database.to_string(), token));
        self
    }

    pub fn connected_databases(&self) -> Vec<String> {
        self.log.lock().unwrap().connects.clone()
    }
}

struct FakeSession {
    label: String,
    database: String,
    batches: u32,
    log: Arc<Mutex<SqlLog>>,
    execute_failures: Arc<Mutex<HashMap<String, VecDeque<SqlError>>>>,
    hangs: bool,
    cancel: Option<CancellationToken>,
}

#[async_trait]
impl SqlConnector for FakeConnector {
    async fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn SqlSession>, SqlError> {
        let server = target.host.trim_end_matches(".database.windows.net");
        let label = format!("{}/{}", server, target.database);

        if let Some(err) = self.connect_failures.lock().unwrap().get(&target.database) {
            return Err(err.clone());
        }
        self.log.lock().unwrap().connects.push(label.clone());

        let cancel = self
            .cancel_after
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(database, _)| *database == target.database)
            .map(|(_, token)| token.clone());

        Ok(Box::new(FakeSession {
            label,
            database: target.database.clone(),
            batches: 0,
            log: self.log.clone(),
            execute_failures: self.execute_failures.clone(),
            hangs: self.hanging.lock().unwrap().contains(&target.database),
            cancel,
        }))
    }
}

#[async_trait]
impl SqlSession for FakeSession {
    async fn execute(&mut self, _sql: &str, _timeout: Option<Duration>) -> Result<(), SqlError> {
        self.batches += 1;
        self.log.lock().unwrap().statements.push(self.label.clone());

        // only the final execute batch is scripted
        if self.batches < 3 {
            return Ok(());
        }
        if self.hangs {
            std::future::pending::<()>().await;
        }
        let failure = self
            .execute_failures
            .lock()
            .unwrap()
            .get_mut(&self.database)
            .and_then(|queue| queue.pop_front());
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), SqlError> {
        self.log.lock().unwrap().closes += 1;
        if let Some(token) = &self.cancel {
            token.cancel();
        }
        Ok(())
    }
}

pub fn runner(
    provider: FakeProvider,
    connector: Arc<FakeConnector>,
    filters: Filters,
    params: ExecutionParameters,
) -> MaintenanceRunner {
    let script = ProcedureScript::from_sql("alter procedure AzureSQLMaintenance as select 1;", "test")
        .unwrap();
    let executor =
        MaintenanceExecutor::new(connector, Arc::new(script), ConnectionSettings::default());
    MaintenanceRunner::new(Arc::new(provider), executor, filters, params).unwrap()
}

pub fn timeout_error() -> SqlError {
    SqlError::timed_out(Duration::from_secs(1))
}

/// Shared buffer that collects formatted log output
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route debug-level logs of the current thread into a buffer
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
