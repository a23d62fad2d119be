//! Environment-aware safety gate for destructive runs.

use crate::catalog::{CatalogEntry, Environment, TargetSpec};

/// Why a run was stopped before touching the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The selector shape is not allowed to execute in this environment.
    PolicyViolation(String),
    /// The operator did not supply the affirmative token.
    Declined,
}

/// Outcome of evaluating the safety gate, once per run, before any
/// statement is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Dev environment: bulk drops permitted without confirmation.
    Dev,
    /// Prod dry-run: any plan may be computed and displayed, nothing executes.
    ProdRestricted,
    /// Prod execute, single exact object, operator confirmed.
    Confirmed,
    /// Run stops here with no backend calls.
    Aborted(AbortReason),
}

impl GateState {
    /// Whether the execution phase may be entered.
    pub fn allows_execution(&self) -> bool {
        matches!(self, GateState::Dev | GateState::Confirmed)
    }
}

/// Evaluate the gate for a resolved plan.
///
/// `confirm` is the injectable confirmation capability: given the prompt it
/// returns whether the operator supplied the exact affirmative token. It is
/// only ever invoked for a prod execute that passed the selector checks.
pub fn evaluate<F>(
    spec: &TargetSpec,
    plan: &[CatalogEntry],
    execute: bool,
    confirm: &mut F,
) -> GateState
where
    F: FnMut(&str) -> bool,
{
    match spec.environment {
        // Dev schemas are disposable by convention
        Environment::Dev => GateState::Dev,
        Environment::Prod => {
            if !execute {
                return GateState::ProdRestricted;
            }

            if spec.table.is_none() || spec.is_pattern() {
                return GateState::Aborted(AbortReason::PolicyViolation(
                    "prod execute requires --schema (exact, no wildcard) and --table".to_string(),
                ));
            }
            if plan.len() != 1 {
                return GateState::Aborted(AbortReason::PolicyViolation(format!(
                    "prod execute requires exactly one resolved object, found {}",
                    plan.len()
                )));
            }

            let entry = &plan[0];
            let prompt = format!(
                "About to DROP {} {}.{} from PRODUCTION. Type 'yes' to confirm: ",
                entry.kind, entry.schema, entry.name
            );
            if confirm(&prompt) {
                GateState::Confirmed
            } else {
                GateState::Aborted(AbortReason::Declined)
            }
        }
    }
}
