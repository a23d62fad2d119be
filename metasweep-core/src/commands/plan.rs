//! Resolve a selector and return the plan without touching anything.

use crate::catalog::{self, CatalogEntry, TargetSpec};
use crate::client::SqlBackend;
use crate::error::Result;

/// Execute the plan command: resolution only, for audit display.
pub async fn execute<B: SqlBackend>(
    backend: &B,
    catalog: &str,
    spec: &TargetSpec,
) -> Result<Vec<CatalogEntry>> {
    let plan = catalog::resolve(backend, catalog, spec).await?;
    tracing::info!(
        environment = %spec.environment,
        objects = plan.len(),
        "Plan computed"
    );
    Ok(plan)
}
