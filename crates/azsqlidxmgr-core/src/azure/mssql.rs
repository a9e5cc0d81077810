//! Azure SQL connections over TDS
//!
//! Connections authenticate with an Entra ID access token, require encryption
//! and validate the server certificate. Gateway redirects are followed once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use super::credential::{SQL_SCOPE, TokenSource};
use crate::error::SqlError;
use crate::sql::{ConnectionTarget, SqlConnector, SqlSession};

type TdsClient = Client<Compat<TcpStream>>;

/// Production [`SqlConnector`] backed by `tiberius`
pub struct TiberiusConnector {
    tokens: Arc<dyn TokenSource>,
}

impl TiberiusConnector {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self { tokens }
    }

    async fn open(config: Config) -> Result<TdsClient, SqlError> {
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        match Client::connect(config.clone(), tcp.compat_write()).await {
            Ok(client) => Ok(client),
            Err(tiberius::error::Error::Routing { host, port }) => {
                debug!("Redirected to {}:{}", host, port);
                let mut config = config;
                config.host(&host);
                config.port(port);

                let tcp = TcpStream::connect(config.get_addr()).await?;
                tcp.set_nodelay(true)?;
                Ok(Client::connect(config, tcp.compat_write()).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SqlConnector for TiberiusConnector {
    async fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn SqlSession>, SqlError> {
        let token = self
            .tokens
            .token(SQL_SCOPE)
            .await
            .map_err(|e| SqlError::client(e.to_string()))?;

        let mut config = Config::new();
        config.host(&target.host);
        config.port(target.port);
        config.database(&target.database);
        config.authentication(AuthMethod::aad_token(token));
        config.encryption(EncryptionLevel::Required);

        let client = tokio::time::timeout(target.connect_timeout, Self::open(config))
            .await
            .map_err(|_| SqlError::timed_out(target.connect_timeout))??;

        Ok(Box::new(TiberiusSession { client }))
    }
}

struct TiberiusSession {
    client: TdsClient,
}

#[async_trait]
impl SqlSession for TiberiusSession {
    async fn execute(&mut self, sql: &str, timeout: Option<Duration>) -> Result<(), SqlError> {
        let execution = self.client.execute(sql, &[]);
        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, execution)
                .await
                .map_err(|_| SqlError::timed_out(limit))??,
            None => execution.await?,
        };
        debug!("Batch affected {} row(s)", result.total());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), SqlError> {
        self.client.close().await?;
        Ok(())
    }
}
