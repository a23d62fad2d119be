pub mod catalog;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod gate;

use catalog::{CatalogEntry, TargetSpec};
use client::TrinoClient;
use config::SweepConfig;
use error::Result;

pub use catalog::{Environment, ObjectKind};
pub use commands::sweep::{DropOutcome, RunSummary};
pub use config::CliOverrides;
pub use gate::GateState;

/// Main entry point for the metasweep library.
///
/// Create a `Metasweep` instance with a config and use its methods to
/// resolve and drop catalog objects programmatically. The HTTP client is
/// scoped to the instance and released when it is dropped.
pub struct Metasweep {
    pub config: SweepConfig,
    client: TrinoClient,
}

impl Metasweep {
    /// Create a new Metasweep instance, building the gateway client.
    pub fn new(config: SweepConfig) -> Result<Self> {
        let client = TrinoClient::new(&config)?;
        Ok(Self { config, client })
    }

    /// Resolve a selector into a drop plan without mutating anything.
    pub async fn plan(&self, spec: &TargetSpec) -> Result<Vec<CatalogEntry>> {
        commands::plan::execute(&self.client, &self.config.connection.catalog, spec).await
    }

    /// Run a sweep: resolve, evaluate the safety gate, then drop (or
    /// simulate) each object with per-object failure isolation.
    ///
    /// `confirm` is invoked at most once, for a prod execute that passed
    /// the selector checks.
    pub async fn sweep<F>(
        &self,
        spec: &TargetSpec,
        execute: bool,
        confirm: &mut F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&str) -> bool,
    {
        commands::sweep::execute(
            &self.client,
            &self.config.connection.catalog,
            spec,
            execute,
            confirm,
        )
        .await
    }
}
