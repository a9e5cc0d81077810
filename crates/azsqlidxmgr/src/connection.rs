//! Wiring of Azure clients for a run

use std::sync::Arc;

use azsqlidxmgr_core::azure::{ArmClient, AzureCredential, TiberiusConnector, TokenSource};
use azsqlidxmgr_core::{MaintenanceExecutor, MaintenanceRunner, ProcedureScript, Settings};
use tracing::{debug, info};

use crate::error::Result as CliResult;

/// Builds authenticated clients from resolved settings
pub struct ConnectionManager {
    pub settings: Settings,
}

impl ConnectionManager {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// One credential shared by the resource manager and SQL connections
    pub fn create_credential(&self) -> CliResult<Arc<dyn TokenSource>> {
        debug!(
            "Creating Azure credential (interactive: {})",
            self.settings.params.interactive
        );
        let credential = AzureCredential::new(self.settings.params.interactive)?;
        Ok(Arc::new(credential))
    }

    pub fn load_script(&self) -> CliResult<ProcedureScript> {
        let script = ProcedureScript::load(self.settings.procedure_script.as_deref())?;
        info!("Using {} procedure script", script.source());
        Ok(script)
    }

    /// Assemble the runner for the whole traversal
    pub fn create_runner(&self) -> CliResult<MaintenanceRunner> {
        let script = self.load_script()?;
        let credential = self.create_credential()?;

        debug!(
            "Using resource manager at {}",
            self.settings.management_endpoint
        );
        let provider = ArmClient::new(
            self.settings.management_endpoint.clone(),
            credential.clone(),
        );
        let executor = MaintenanceExecutor::new(
            Arc::new(TiberiusConnector::new(credential)),
            Arc::new(script),
            self.settings.connection,
        );

        Ok(MaintenanceRunner::new(
            Arc::new(provider),
            executor,
            self.settings.filters.clone(),
            self.settings.params,
        )?)
    }
}
