//! Target resolution: map a (environment, schema, table) selector onto a
//! concrete list of catalog objects.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::client::{quote_ident, quote_literal, SqlBackend};
use crate::error::{Result, SweepError};

/// Target environment for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "dev"),
            Environment::Prod => write!(f, "prod"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = SweepError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(SweepError::ConfigError(format!(
                "Invalid target '{}'. Use 'dev' or 'prod'.",
                s
            ))),
        }
    }
}

/// What the operator asked to remove. Immutable for the run.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub environment: Environment,
    /// Exact schema name, or a LIKE pattern when it contains `%`.
    pub schema: String,
    /// A specific object; forces exact-schema resolution.
    pub table: Option<String>,
}

impl TargetSpec {
    /// Whether the schema selector is a LIKE pattern.
    ///
    /// Only `%` marks a pattern — schema names routinely contain underscores,
    /// so `_` is matched literally. Escaping a literal `%` is not supported.
    pub fn is_pattern(&self) -> bool {
        self.schema.contains('%')
    }
}

/// Kind of catalog object, read from the metadata type column.
///
/// The kind picks the DROP keyword; issuing a TABLE drop against a VIEW
/// (or the reverse) is rejected by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    fn from_type_column(table_type: &str) -> Self {
        // information_schema reports "VIEW" or "BASE TABLE"
        if table_type.eq_ignore_ascii_case("VIEW") {
            ObjectKind::View
        } else {
            ObjectKind::Table
        }
    }

    /// The DROP statement keyword for this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One object matched by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub schema: String,
    pub name: String,
    pub kind: ObjectKind,
}

impl CatalogEntry {
    /// Render the idempotent removal statement for this object.
    pub fn drop_statement(&self, catalog: &str) -> String {
        format!(
            "DROP {} IF EXISTS {}.{}.{}",
            self.kind.keyword(),
            quote_ident(catalog),
            quote_ident(&self.schema),
            quote_ident(&self.name)
        )
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.schema, self.name, self.kind)
    }
}

/// Build the metadata query for a selector.
fn resolution_query(catalog: &str, spec: &TargetSpec) -> String {
    let base = format!(
        "SELECT table_schema, table_name, table_type \
         FROM {}.information_schema.tables \
         WHERE table_catalog = {}",
        quote_ident(catalog),
        quote_literal(catalog)
    );

    let filter = if let Some(ref table) = spec.table {
        // Specific object: exact schema and name, no pattern matching
        format!(
            " AND table_schema = {} AND table_name = {}",
            quote_literal(&spec.schema),
            quote_literal(table)
        )
    } else if spec.is_pattern() {
        format!(" AND table_schema LIKE {}", quote_literal(&spec.schema))
    } else {
        format!(" AND table_schema = {}", quote_literal(&spec.schema))
    };

    // Stable ordering keeps dry-run output reproducible
    format!("{}{} ORDER BY table_schema, table_name", base, filter)
}

fn row_field<'a>(row: &'a [Value], i: usize) -> Result<&'a str> {
    row.get(i)
        .and_then(Value::as_str)
        .ok_or_else(|| SweepError::QueryFailed {
            message: format!("Malformed catalog metadata row: {:?}", row),
        })
}

fn parse_row(row: &[Value]) -> Result<CatalogEntry> {
    Ok(CatalogEntry {
        schema: row_field(row, 0)?.to_string(),
        name: row_field(row, 1)?.to_string(),
        kind: ObjectKind::from_type_column(row_field(row, 2)?),
    })
}

/// Resolve a selector into an ordered drop plan.
///
/// A metadata query failure is fatal and aborts the run before any drop is
/// attempted. Zero matches is not an error — the plan is simply empty.
pub async fn resolve<B: SqlBackend>(
    backend: &B,
    catalog: &str,
    spec: &TargetSpec,
) -> Result<Vec<CatalogEntry>> {
    let sql = resolution_query(catalog, spec);
    if spec.table.is_some() {
        tracing::info!(schema = %spec.schema, table = ?spec.table, "Resolving specific object");
    } else if spec.is_pattern() {
        tracing::info!(pattern = %spec.schema, "Resolving objects by schema pattern");
    } else {
        tracing::info!(schema = %spec.schema, "Resolving all objects in schema");
    }
    tracing::debug!(sql = %sql, "Metadata query");

    let rows = backend.query(&sql).await?;
    let plan = rows
        .iter()
        .map(|row| parse_row(row))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(matched = plan.len(), "Resolution complete");
    Ok(plan)
}
