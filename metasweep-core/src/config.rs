use std::fmt;

use serde::Deserialize;

use crate::catalog::Environment;
use crate::error::{Result, SweepError};

/// HTTP scheme used to reach the metastore gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpScheme {
    /// TLS (default) — the only sensible choice outside local testing.
    Https,
    /// Plaintext, for local gateways.
    Http,
}

impl Default for HttpScheme {
    fn default() -> Self {
        HttpScheme::Https
    }
}

impl fmt::Display for HttpScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpScheme::Https => write!(f, "https"),
            HttpScheme::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for HttpScheme {
    type Err = SweepError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "https" => Ok(HttpScheme::Https),
            "http" => Ok(HttpScheme::Http),
            _ => Err(SweepError::ConfigError(format!(
                "Invalid HTTP scheme '{}'. Use 'https' or 'http'.",
                s
            ))),
        }
    }
}

/// Top-level configuration for metasweep.
#[derive(Debug, Clone, Default)]
pub struct SweepConfig {
    pub connection: ConnectionConfig,
    pub sweep: SweepSettings,
}

/// Metastore gateway connection configuration.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: String,
    pub api_key: Option<String>,
    pub http_scheme: HttpScheme,
    pub catalog: String,
    pub connect_timeout_secs: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 443,
            user: "metasweep".to_string(),
            api_key: None,
            http_scheme: HttpScheme::Https,
            catalog: "hive".to_string(),
            connect_timeout_secs: 30,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("http_scheme", &self.http_scheme)
            .field("catalog", &self.catalog)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Sweep behavior settings.
#[derive(Debug, Clone, Default)]
pub struct SweepSettings {
    /// Team name used to derive default schema selectors:
    /// `{team}__tmp_%` for dev, `{team}` for prod.
    pub team: Option<String>,
}

// ── TOML deserialization structs ──

#[derive(Deserialize, Default)]
struct TomlConfig {
    connection: Option<TomlConnectionConfig>,
    sweep: Option<TomlSweepSettings>,
}

#[derive(Deserialize, Default)]
struct TomlConnectionConfig {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    api_key: Option<String>,
    http_scheme: Option<String>,
    catalog: Option<String>,
    connect_timeout: Option<u32>,
}

#[derive(Deserialize, Default)]
struct TomlSweepSettings {
    team: Option<String>,
}

/// CLI overrides that take highest priority.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub api_key: Option<String>,
    pub http_scheme: Option<String>,
    pub catalog: Option<String>,
    pub team: Option<String>,
    pub connect_timeout: Option<u32>,
}

impl SweepConfig {
    /// Load configuration with the following priority (highest wins):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. TOML config file
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&str>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = SweepConfig::default();

        // Layer 3: TOML config file
        let toml_path = config_path.unwrap_or("metasweep.toml");
        if let Ok(content) = std::fs::read_to_string(toml_path) {
            // Warn if config file has overly permissive permissions (Unix only)
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = std::fs::metadata(toml_path) {
                    let mode = meta.permissions().mode();
                    if mode & 0o077 != 0 {
                        tracing::warn!(
                            path = %toml_path,
                            mode = format!("{:o}", mode),
                            "Config file has overly permissive permissions. Consider chmod 600."
                        );
                    }
                }
            }
            let toml_config: TomlConfig = toml::from_str(&content).map_err(|e| {
                SweepError::ConfigError(format!(
                    "Failed to parse config file '{}': {}",
                    toml_path, e
                ))
            })?;
            config.apply_toml(toml_config);
        } else if config_path.is_some() {
            // If explicitly specified, error if not found
            return Err(SweepError::ConfigError(format!(
                "Config file '{}' not found",
                toml_path
            )));
        }

        // Layer 2: Environment variables
        config.apply_env();

        // Layer 1: CLI overrides
        config.apply_cli(overrides);

        // The catalog and user land in rendered SQL and request headers
        crate::client::validate_identifier(&config.connection.catalog)?;
        crate::client::validate_identifier(&config.connection.user)?;

        Ok(config)
    }

    fn apply_toml(&mut self, toml: TomlConfig) {
        if let Some(c) = toml.connection {
            if let Some(v) = c.host { self.connection.host = Some(v); }
            if let Some(v) = c.port { self.connection.port = v; }
            if let Some(v) = c.user { self.connection.user = v; }
            if let Some(v) = c.api_key { self.connection.api_key = Some(v); }
            if let Some(v) = c.http_scheme {
                if let Ok(scheme) = v.parse() {
                    self.connection.http_scheme = scheme;
                }
            }
            if let Some(v) = c.catalog { self.connection.catalog = v; }
            if let Some(v) = c.connect_timeout { self.connection.connect_timeout_secs = v; }
        }

        if let Some(s) = toml.sweep {
            if let Some(v) = s.team { self.sweep.team = Some(v); }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("METASWEEP_HOST") {
            self.connection.host = Some(v);
        }
        if let Ok(v) = std::env::var("METASWEEP_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.connection.port = port;
            }
        }
        if let Ok(v) = std::env::var("METASWEEP_USER") {
            self.connection.user = v;
        }
        if let Ok(v) = std::env::var("METASWEEP_API_KEY") {
            self.connection.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("METASWEEP_HTTP_SCHEME") {
            if let Ok(scheme) = v.parse() {
                self.connection.http_scheme = scheme;
            }
        }
        if let Ok(v) = std::env::var("METASWEEP_CATALOG") {
            self.connection.catalog = v;
        }
        if let Ok(v) = std::env::var("METASWEEP_CONNECT_TIMEOUT") {
            if let Ok(n) = v.parse::<u32>() {
                self.connection.connect_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("METASWEEP_TEAM") {
            self.sweep.team = Some(v);
        }
    }

    fn apply_cli(&mut self, overrides: &CliOverrides) {
        if let Some(ref v) = overrides.host {
            self.connection.host = Some(v.clone());
        }
        if let Some(v) = overrides.port {
            self.connection.port = v;
        }
        if let Some(ref v) = overrides.user {
            self.connection.user = v.clone();
        }
        if let Some(ref v) = overrides.api_key {
            self.connection.api_key = Some(v.clone());
        }
        if let Some(ref v) = overrides.http_scheme {
            // Ignore parse errors here — they'll surface when building the client
            if let Ok(scheme) = v.parse() {
                self.connection.http_scheme = scheme;
            }
        }
        if let Some(ref v) = overrides.catalog {
            self.connection.catalog = v.clone();
        }
        if let Some(ref v) = overrides.team {
            self.sweep.team = Some(v.clone());
        }
        if let Some(v) = overrides.connect_timeout {
            self.connection.connect_timeout_secs = v;
        }
    }

    /// Base URL of the metastore gateway.
    pub fn base_url(&self) -> Result<String> {
        let host = self.connection.host.as_deref().ok_or_else(|| {
            SweepError::ConfigError("Gateway host is required".to_string())
        })?;
        Ok(format!(
            "{}://{}:{}",
            self.connection.http_scheme, host, self.connection.port
        ))
    }

    /// Default schema selector for an environment when `--schema` is not given.
    ///
    /// Dev targets the disposable `{team}__tmp_%` namespace; prod targets the
    /// team schema itself.
    pub fn default_schema(&self, environment: Environment) -> Result<String> {
        let team = self.sweep.team.as_deref().ok_or_else(|| {
            SweepError::ConfigError(
                "No schema selector given and no team configured. \
                 Pass --schema or set METASWEEP_TEAM."
                    .to_string(),
            )
        })?;
        Ok(match environment {
            Environment::Dev => format!("{}__tmp_%", team),
            Environment::Prod => team.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweepConfig::default();
        assert_eq!(config.connection.port, 443);
        assert_eq!(config.connection.user, "metasweep");
        assert_eq!(config.connection.catalog, "hive");
        assert_eq!(config.connection.http_scheme, HttpScheme::Https);
        assert_eq!(config.connection.connect_timeout_secs, 30);
        assert!(config.connection.host.is_none());
        assert!(config.sweep.team.is_none());
    }

    #[test]
    fn test_base_url() {
        let mut config = SweepConfig::default();
        config.connection.host = Some("trino.example.com".to_string());
        assert_eq!(config.base_url().unwrap(), "https://trino.example.com:443");

        config.connection.http_scheme = HttpScheme::Http;
        config.connection.port = 8080;
        assert_eq!(config.base_url().unwrap(), "http://trino.example.com:8080");
    }

    #[test]
    fn test_base_url_missing_host() {
        let config = SweepConfig::default();
        assert!(config.base_url().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = SweepConfig::default();
        let overrides = CliOverrides {
            host: Some("gateway.internal".to_string()),
            port: Some(8443),
            user: Some("cleanup-bot".to_string()),
            api_key: Some("secret".to_string()),
            http_scheme: Some("http".to_string()),
            catalog: Some("iceberg".to_string()),
            team: Some("analytics".to_string()),
            connect_timeout: Some(10),
        };

        config.apply_cli(&overrides);

        assert_eq!(config.connection.host.as_deref(), Some("gateway.internal"));
        assert_eq!(config.connection.port, 8443);
        assert_eq!(config.connection.user, "cleanup-bot");
        assert_eq!(config.connection.api_key.as_deref(), Some("secret"));
        assert_eq!(config.connection.http_scheme, HttpScheme::Http);
        assert_eq!(config.connection.catalog, "iceberg");
        assert_eq!(config.sweep.team.as_deref(), Some("analytics"));
        assert_eq!(config.connection.connect_timeout_secs, 10);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
[connection]
host = "trino.example.com"
port = 8443
catalog = "iceberg"
api_key = "abc123"

[sweep]
team = "analytics"
"#;

        let toml_config: TomlConfig = toml::from_str(toml_str).unwrap();
        let mut config = SweepConfig::default();
        config.apply_toml(toml_config);

        assert_eq!(config.connection.host.as_deref(), Some("trino.example.com"));
        assert_eq!(config.connection.port, 8443);
        assert_eq!(config.connection.catalog, "iceberg");
        assert_eq!(config.connection.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.sweep.team.as_deref(), Some("analytics"));
    }

    #[test]
    fn test_load_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metasweep.toml");
        std::fs::write(
            &path,
            "[connection]\nhost = \"trino.example.com\"\n\n[sweep]\nteam = \"analytics\"\n",
        )
        .unwrap();

        let config =
            SweepConfig::load(Some(path.to_str().unwrap()), &CliOverrides::default()).unwrap();
        assert_eq!(config.connection.host.as_deref(), Some("trino.example.com"));
        assert_eq!(config.sweep.team.as_deref(), Some("analytics"));
    }

    #[test]
    fn test_load_missing_explicit_config_file() {
        let err = SweepConfig::load(Some("/nonexistent/metasweep.toml"), &CliOverrides::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_default_schema_by_environment() {
        let mut config = SweepConfig::default();
        config.sweep.team = Some("analytics".to_string());

        assert_eq!(
            config.default_schema(Environment::Dev).unwrap(),
            "analytics__tmp_%"
        );
        assert_eq!(
            config.default_schema(Environment::Prod).unwrap(),
            "analytics"
        );
    }

    #[test]
    fn test_default_schema_requires_team() {
        let config = SweepConfig::default();
        assert!(config.default_schema(Environment::Dev).is_err());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let mut config = SweepConfig::default();
        config.connection.api_key = Some("super-secret".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
