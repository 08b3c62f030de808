//! Hub-wide settings loaded from `dbhub.toml` and `DBHUB_*` environment variables
//!
//! File values come first; environment overrides are applied on top and the
//! result is validated before anything else uses it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::database::DatabaseConfig;
use super::sources::EnvSource;
use crate::error::{HubError, HubResult};

/// Configuration file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "dbhub.toml";

/// Hub-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Directory holding one subdirectory per client
    pub clients_root: PathBuf,
    /// Directory holding schema files named by provider or database
    pub schemas_root: PathBuf,
    pub default_database: Option<String>,
    pub probe_timeout_ms: u64,
    pub discovery_timeout_ms: u64,
    /// Cap on concurrent probes and disconnects
    pub max_concurrency: usize,
    /// External migration program, split on whitespace
    pub migration_tool: String,
    pub default_factory: String,
    pub databases: Vec<DatabaseConfig>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            clients_root: PathBuf::from("clients"),
            schemas_root: PathBuf::from("schemas"),
            default_database: None,
            probe_timeout_ms: 5_000,
            discovery_timeout_ms: 2_000,
            max_concurrency: 8,
            migration_tool: "npx prisma".to_string(),
            default_factory: "sqlx".to_string(),
            databases: Vec::new(),
        }
    }
}

impl HubConfig {
    /// Load settings from a TOML file, then apply `DBHUB_*` overrides
    ///
    /// An explicit `path` must exist. Without one, `dbhub.toml` in the current
    /// directory is used when present.
    pub fn load(path: Option<&Path>, env: &dyn EnvSource) -> HubResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> HubResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HubError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Override settings from `DBHUB_*` environment variables
    pub fn apply_env(&mut self, env: &dyn EnvSource) {
        if let Some(value) = env.var("DBHUB_CLIENTS_ROOT") {
            self.clients_root = PathBuf::from(value);
        }
        if let Some(value) = env.var("DBHUB_SCHEMAS_ROOT") {
            self.schemas_root = PathBuf::from(value);
        }
        if let Some(value) = env.var("DBHUB_DEFAULT_DATABASE") {
            self.default_database = Some(value);
        }
        if let Some(value) = env.var("DBHUB_MIGRATION_TOOL") {
            self.migration_tool = value;
        }
        if let Some(value) = env.var("DBHUB_PROBE_TIMEOUT_MS") {
            match value.parse() {
                Ok(ms) => self.probe_timeout_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid DBHUB_PROBE_TIMEOUT_MS: {}", value),
            }
        }
    }

    pub fn validate(&self) -> HubResult<()> {
        if self.max_concurrency == 0 {
            return Err(HubError::configuration("max_concurrency must be at least 1"));
        }
        if self.migration_tool.split_whitespace().next().is_none() {
            return Err(HubError::configuration("migration_tool must not be empty"));
        }
        if let Some(db) = self.databases.iter().find(|db| db.name.trim().is_empty()) {
            return Err(HubError::configuration(format!(
                "database entry with provider '{}' has an empty name",
                db.provider
            )));
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    /// Migration program and its leading arguments
    pub fn migration_command(&self) -> (String, Vec<String>) {
        let mut parts = self.migration_tool.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        (program, parts.collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sources::MapEnv;
    use crate::provider::Provider;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.clients_root, PathBuf::from("clients"));
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.migration_command(),
            ("npx".to_string(), vec!["prisma".to_string()])
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_file_and_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            clients_root = "src/clients"
            default_database = "orders"
            max_concurrency = 2

            [[databases]]
            name = "orders"
            provider = "postgresql"
            url = "postgresql://localhost/orders"
            "#
        )
        .unwrap();

        let env = MapEnv::new()
            .with("DBHUB_SCHEMAS_ROOT", "db/schemas")
            .with("DBHUB_PROBE_TIMEOUT_MS", "250");
        let config = HubConfig::load(Some(file.path()), &env).unwrap();

        assert_eq!(config.clients_root, PathBuf::from("src/clients"));
        assert_eq!(config.schemas_root, PathBuf::from("db/schemas"));
        assert_eq!(config.probe_timeout_ms, 250);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.databases.len(), 1);
        assert_eq!(config.databases[0].provider, Provider::PostgreSQL);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = HubConfig::load(Some(Path::new("/nonexistent/dbhub.toml")), &MapEnv::new());
        assert!(matches!(err, Err(HubError::Configuration { .. })));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = HubConfig {
            max_concurrency: 0,
            ..HubConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
