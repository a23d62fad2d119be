//! Trino-protocol HTTP client and SQL identifier quoting.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::config::SweepConfig;
use crate::error::{Result, SweepError};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const STATEMENT_PATH: &str = "/v1/statement";

/// Quote a SQL identifier to prevent SQL injection.
///
/// Doubles any embedded double-quotes and wraps in double-quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL string literal.
///
/// Doubles any embedded single-quotes and wraps in single-quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Validate that a SQL identifier contains only safe characters.
///
/// Returns an error for names with characters outside `[a-zA-Z0-9_]`.
/// Even with quoting (defense in depth), we reject suspicious identifiers early.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SweepError::ConfigError(
            "Identifier cannot be empty".to_string(),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SweepError::ConfigError(format!(
            "Identifier '{}' contains invalid characters. Only [a-zA-Z0-9_] are allowed.",
            name
        )));
    }
    Ok(())
}

/// The query-executing service the resolver and orchestrator run against.
///
/// Abstracted so the sweep logic can be driven by a scripted backend in tests.
#[allow(async_fn_in_trait)]
pub trait SqlBackend {
    /// Run a statement and collect all result rows.
    async fn query(&self, sql: &str) -> Result<Vec<Vec<Value>>>;

    /// Run a statement for its side effect, discarding any rows.
    async fn execute(&self, sql: &str) -> Result<()>;
}

// ── Trino REST protocol types ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    id: String,
    next_uri: Option<String>,
    data: Option<Vec<Vec<Value>>>,
    error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryError {
    message: Option<String>,
    error_name: Option<String>,
}

impl QueryError {
    fn into_message(self) -> String {
        match (self.error_name, self.message) {
            (Some(name), Some(msg)) => format!("{}: {}", name, msg),
            (None, Some(msg)) => msg,
            (Some(name), None) => name,
            (None, None) => "unknown server error".to_string(),
        }
    }
}

/// Client for a Trino-compatible SQL-over-HTTP gateway.
///
/// Statements are POSTed to `/v1/statement`; the server answers with result
/// pages chained via `nextUri`, which are followed until the query finishes.
#[derive(Debug, Clone)]
pub struct TrinoClient {
    base_url: reqwest::Url,
    user: String,
    api_key: String,
    catalog: String,
    inner: reqwest::Client,
}

impl TrinoClient {
    /// Build a client from config. Fails if host or API key is missing.
    pub fn new(config: &SweepConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let base_url = reqwest::Url::parse(&base_url)
            .map_err(|e| SweepError::ConfigError(format!("Invalid gateway URL: {}", e)))?;

        let api_key = config.connection.api_key.clone().ok_or_else(|| {
            SweepError::ConfigError(
                "API key is required. Pass --api-key or set METASWEEP_API_KEY.".to_string(),
            )
        })?;

        let mut builder = reqwest::Client::builder().user_agent(APP_USER_AGENT);
        if config.connection.connect_timeout_secs > 0 {
            builder = builder
                .connect_timeout(Duration::from_secs(config.connection.connect_timeout_secs as u64));
        }
        let inner = builder.build()?;

        Ok(Self {
            base_url,
            user: config.connection.user.clone(),
            api_key,
            catalog: config.connection.catalog.clone(),
            inner,
        })
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.user, Some(&self.api_key))
            .header("X-Trino-User", &self.user)
            .header("X-Trino-Catalog", &self.catalog)
            .header("X-Trino-Session", "transformations=true")
    }

    async fn fetch_page(&self, req: reqwest::RequestBuilder) -> Result<QueryResults> {
        let res = self.authed(req).send().await?.error_for_status()?;
        let page: QueryResults = res.json().await?;
        Ok(page)
    }

    /// Submit a statement and drain all result pages.
    async fn run(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        let url = self
            .base_url
            .join(STATEMENT_PATH)
            .map_err(|e| SweepError::ConfigError(format!("Invalid gateway URL: {}", e)))?;

        let mut page = self
            .fetch_page(self.inner.post(url).body(sql.to_string()))
            .await?;
        tracing::debug!(query_id = %page.id, "Statement submitted");

        let mut rows = Vec::new();
        loop {
            if let Some(err) = page.error.take() {
                return Err(SweepError::QueryFailed {
                    message: err.into_message(),
                });
            }
            if let Some(data) = page.data.take() {
                rows.extend(data);
            } else if page.next_uri.is_some() {
                // Queued pages can come back immediately; don't hammer the server
                tokio::time::sleep(Duration::from_millis(100)).await;
            }

            let Some(next) = page.next_uri.take() else {
                break;
            };
            page = self.fetch_page(self.inner.get(next)).await?;
        }

        Ok(rows)
    }
}

impl SqlBackend for TrinoClient {
    async fn query(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        self.run(sql).await
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.run(sql).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("my_table"), "\"my_table\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("analytics"), "'analytics'");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("my_table_123").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("bad-name").is_err());
        assert!(validate_identifier("drop table").is_err());
    }

    #[test]
    fn test_query_error_message() {
        let err = QueryError {
            message: Some("Schema not found".to_string()),
            error_name: Some("SCHEMA_NOT_FOUND".to_string()),
        };
        assert_eq!(err.into_message(), "SCHEMA_NOT_FOUND: Schema not found");

        let err = QueryError {
            message: None,
            error_name: None,
        };
        assert_eq!(err.into_message(), "unknown server error");
    }

    #[test]
    fn test_results_deserialization() {
        let page: QueryResults = serde_json::from_str(
            r#"{
                "id": "20260828_000000_00000_abcde",
                "nextUri": "https://gw/v1/statement/x/1",
                "data": [["s", "t", "BASE TABLE"]],
                "stats": {"state": "RUNNING"}
            }"#,
        )
        .unwrap();
        assert_eq!(page.id, "20260828_000000_00000_abcde");
        assert!(page.next_uri.is_some());
        assert_eq!(page.data.unwrap().len(), 1);
        assert!(page.error.is_none());
    }
}
