//! Bearer token acquisition
//!
//! Tokens come from the default Azure credential chain (environment, managed
//! identity, developer tools). With interactive mode enabled a failed
//! acquisition triggers one `az login` and the chain is rebuilt.

use std::sync::Arc;

use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};

/// Scope for Azure SQL Database tokens
pub const SQL_SCOPE: &str = "https://database.windows.net/.default";

/// Scope for a resource manager endpoint
pub fn management_scope(endpoint: &url::Url) -> String {
    format!("{}/.default", endpoint.as_str().trim_end_matches('/'))
}

/// Anything that can hand out bearer tokens for a scope
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self, scope: &str) -> Result<String>;
}

/// Token source backed by `azure_identity`
pub struct AzureCredential {
    inner: Mutex<Arc<dyn TokenCredential>>,
    interactive: bool,
}

fn credential_error(e: azure_core::Error) -> CoreError {
    CoreError::Credential(e.to_string())
}

impl AzureCredential {
    pub fn new(interactive: bool) -> Result<Self> {
        let credential = azure_identity::create_credential().map_err(credential_error)?;
        Ok(Self {
            inner: Mutex::new(credential),
            interactive,
        })
    }

    async fn acquire(credential: &Arc<dyn TokenCredential>, scope: &str) -> Result<String> {
        let token = credential
            .get_token(&[scope])
            .await
            .map_err(credential_error)?;
        Ok(token.token.secret().to_string())
    }

    async fn login() -> Result<()> {
        info!("Signing in interactively with 'az login' ...");
        let status = Command::new("az")
            .arg("login")
            .status()
            .await
            .map_err(|e| CoreError::Credential(format!("failed to start 'az login': {}", e)))?;
        if !status.success() {
            return Err(CoreError::Credential(format!(
                "'az login' exited with {}",
                status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenSource for AzureCredential {
    async fn token(&self, scope: &str) -> Result<String> {
        let mut credential = self.inner.lock().await;
        debug!("Requesting token for {}", scope);

        match Self::acquire(&credential, scope).await {
            Ok(token) => Ok(token),
            Err(e) if self.interactive => {
                warn!("Non-interactive authentication failed: {}", e);
                Self::login().await?;
                *credential = azure_identity::create_credential().map_err(credential_error)?;
                Self::acquire(&credential, scope).await
            }
            Err(e) => Err(e),
        }
    }
}
