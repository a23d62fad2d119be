//! Drop orchestration: gate evaluation, statement rendering, execute-or-simulate
//! iteration with per-object failure isolation.

use serde::Serialize;

use crate::catalog::{self, CatalogEntry, ObjectKind, TargetSpec};
use crate::client::SqlBackend;
use crate::error::{Result, SweepError};
use crate::gate::{self, AbortReason, GateState};

/// Result of one attempted drop.
#[derive(Debug, Clone, Serialize)]
pub struct DropOutcome {
    pub schema: String,
    pub name: String,
    pub kind: ObjectKind,
    pub statement: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Terminal artifact of a run. Never mutated after iteration completes.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub gate: &'static str,
    pub outcomes: Vec<DropOutcome>,
}

fn gate_label(state: &GateState) -> &'static str {
    match state {
        GateState::Dev => "dev",
        GateState::ProdRestricted => "prod-restricted",
        GateState::Confirmed => "confirmed",
        GateState::Aborted(_) => "aborted",
    }
}

/// Execute the sweep command.
///
/// Resolves the plan, evaluates the safety gate, then walks the plan
/// strictly sequentially. In execute mode a failing statement is recorded
/// and iteration continues; a dry run never contacts the backend after
/// resolution.
pub async fn execute<B, F>(
    backend: &B,
    catalog: &str,
    spec: &TargetSpec,
    execute_mode: bool,
    confirm: &mut F,
) -> Result<RunSummary>
where
    B: SqlBackend,
    F: FnMut(&str) -> bool,
{
    let plan = catalog::resolve(backend, catalog, spec).await?;

    let state = gate::evaluate(spec, &plan, execute_mode, confirm);
    match &state {
        GateState::Aborted(AbortReason::PolicyViolation(reason)) => {
            return Err(SweepError::PolicyViolation(reason.clone()));
        }
        GateState::Aborted(AbortReason::Declined) => {
            return Err(SweepError::ConfirmationDeclined);
        }
        _ => {}
    }

    let dry_run = !execute_mode;
    if plan.is_empty() {
        tracing::info!("No objects matched the selector. Nothing to drop.");
    } else if dry_run {
        tracing::warn!(
            objects = plan.len(),
            "DRY RUN — statements are shown but not executed"
        );
    } else {
        tracing::warn!(objects = plan.len(), environment = %spec.environment, "Dropping objects");
    }

    let mut outcomes = Vec::with_capacity(plan.len());
    for entry in &plan {
        outcomes.push(drop_one(backend, catalog, entry, dry_run).await);
    }

    let succeeded = outcomes.iter().filter(|o| o.succeeded).count();
    let summary = RunSummary {
        total: outcomes.len(),
        succeeded,
        failed: outcomes.len() - succeeded,
        dry_run,
        gate: gate_label(&state),
        outcomes,
    };

    tracing::info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        dry_run = summary.dry_run,
        "Sweep completed"
    );
    Ok(summary)
}

/// Attempt one drop. Errors are captured in the outcome, never propagated —
/// one failing object must not abort the rest of the plan.
async fn drop_one<B: SqlBackend>(
    backend: &B,
    catalog: &str,
    entry: &CatalogEntry,
    dry_run: bool,
) -> DropOutcome {
    let statement = entry.drop_statement(catalog);

    // Every statement is visible before it is attempted
    tracing::info!(statement = %statement, "DROP");

    let (succeeded, error) = if dry_run {
        (true, None)
    } else {
        match backend.execute(&statement).await {
            Ok(()) => {
                tracing::info!(object = %entry, "Dropped");
                (true, None)
            }
            Err(e) => {
                tracing::error!(object = %entry, error = %e, "Drop failed, continuing");
                (false, Some(e.to_string()))
            }
        }
    };

    DropOutcome {
        schema: entry.schema.clone(),
        name: entry.name.clone(),
        kind: entry.kind,
        statement,
        succeeded,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Environment;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Scripted backend: fixed metadata rows, optional failures keyed by
    /// object name, and a log of every statement it receives.
    struct MockBackend {
        rows: Vec<Vec<Value>>,
        fail_on: Vec<&'static str>,
        log: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn new(rows: Vec<Vec<Value>>) -> Self {
            Self {
                rows,
                fail_on: Vec::new(),
                log: Mutex::new(Vec::new()),
            }
        }

        fn statements(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn drops(&self) -> Vec<String> {
            self.statements()
                .into_iter()
                .filter(|s| s.starts_with("DROP"))
                .collect()
        }
    }

    impl SqlBackend for MockBackend {
        async fn query(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
            self.log.lock().unwrap().push(sql.to_string());
            Ok(self.rows.clone())
        }

        async fn execute(&self, sql: &str) -> Result<()> {
            self.log.lock().unwrap().push(sql.to_string());
            if self.fail_on.iter().any(|name| sql.contains(name)) {
                return Err(SweepError::QueryFailed {
                    message: "Access denied".to_string(),
                });
            }
            Ok(())
        }
    }

    fn row(schema: &str, name: &str, kind: &str) -> Vec<Value> {
        vec![json!(schema), json!(name), json!(kind)]
    }

    fn dev_spec(schema: &str) -> TargetSpec {
        TargetSpec {
            environment: Environment::Dev,
            schema: schema.to_string(),
            table: None,
        }
    }

    fn no_confirm(_: &str) -> bool {
        panic!("confirmation must not be requested");
    }

    #[tokio::test]
    async fn test_dry_run_never_mutates() {
        let backend = MockBackend::new(vec![
            row("a__tmp_x", "t1", "BASE TABLE"),
            row("a__tmp_x", "v1", "VIEW"),
        ]);
        let mut confirm = no_confirm;
        let summary = execute(&backend, "hive", &dev_spec("a__tmp_%"), false, &mut confirm)
            .await
            .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        // Only the metadata query reached the backend
        assert!(backend.drops().is_empty());
        // Statements are still rendered for audit
        assert!(summary.outcomes[0].statement.starts_with("DROP TABLE IF EXISTS"));
        assert!(summary.outcomes[1].statement.starts_with("DROP VIEW IF EXISTS"));
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let backend = MockBackend {
            rows: vec![
                row("a__tmp_x", "t1", "BASE TABLE"),
                row("a__tmp_x", "t2", "BASE TABLE"),
                row("a__tmp_x", "t3", "BASE TABLE"),
            ],
            fail_on: vec!["\"t2\""],
            log: Mutex::new(Vec::new()),
        };
        let mut confirm = no_confirm;
        let summary = execute(&backend, "hive", &dev_spec("a__tmp_%"), true, &mut confirm)
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded + summary.failed, summary.total);
        // t3 was still attempted after t2 failed
        assert_eq!(backend.drops().len(), 3);
        assert!(!summary.outcomes[1].succeeded);
        assert!(summary.outcomes[1].error.as_deref().unwrap().contains("Access denied"));
        assert!(summary.outcomes[2].succeeded);
    }

    #[tokio::test]
    async fn test_empty_plan_is_success() {
        let backend = MockBackend::new(Vec::new());
        let mut confirm = no_confirm;
        let summary = execute(&backend, "hive", &dev_spec("a__tmp_%"), true, &mut confirm)
            .await
            .unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
        assert!(backend.drops().is_empty());
    }

    #[tokio::test]
    async fn test_view_gets_view_keyword() {
        let backend = MockBackend::new(vec![row("a__tmp_x", "daily", "VIEW")]);
        let mut confirm = no_confirm;
        let summary = execute(&backend, "hive", &dev_spec("a__tmp_x"), true, &mut confirm)
            .await
            .unwrap();

        assert_eq!(
            backend.drops(),
            vec!["DROP VIEW IF EXISTS \"hive\".\"a__tmp_x\".\"daily\"".to_string()]
        );
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_fatal() {
        struct FailingBackend;
        impl SqlBackend for FailingBackend {
            async fn query(&self, _sql: &str) -> Result<Vec<Vec<Value>>> {
                Err(SweepError::QueryFailed {
                    message: "backend down".to_string(),
                })
            }
            async fn execute(&self, _sql: &str) -> Result<()> {
                panic!("must not execute after failed resolution");
            }
        }

        let mut confirm = no_confirm;
        let err = execute(&FailingBackend, "hive", &dev_spec("a__tmp_%"), true, &mut confirm)
            .await
            .unwrap_err();
        assert!(matches!(err, SweepError::QueryFailed { .. }));
    }
}
