//! Database declarations derived from provider-family environment variables
//!
//! Only the bootstrap step reads `PG_*`, `MYSQL_*`, `SQLITE_PATH`,
//! `SQLSERVER_*` and `MONGODB_*`; the resolver never does.

use std::path::Path;

use super::database::{ConnectionParams, DatabaseConfig};
use super::sources::EnvSource;
use crate::provider::Provider;

struct Family {
    prefix: &'static str,
    provider: Provider,
}

const NETWORK_FAMILIES: [Family; 3] = [
    Family {
        prefix: "PG",
        provider: Provider::PostgreSQL,
    },
    Family {
        prefix: "MYSQL",
        provider: Provider::MySQL,
    },
    Family {
        prefix: "SQLSERVER",
        provider: Provider::SqlServer,
    },
];

/// Build database declarations from provider-family variables
pub fn from_env(env: &dyn EnvSource) -> Vec<DatabaseConfig> {
    let mut configs = Vec::new();

    for family in &NETWORK_FAMILIES {
        let var = |suffix: &str| env.var(&format!("{}_{}", family.prefix, suffix));
        let Some(host) = var("HOST") else {
            continue;
        };

        let port = var("PORT").and_then(|raw| match raw.parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                tracing::warn!("Ignoring invalid {}_PORT: {}", family.prefix, raw);
                None
            }
        });
        let database = var("DATABASE").unwrap_or_else(|| family.provider.to_string());
        let ssl = var("SSL").map(|raw| is_truthy(&raw)).unwrap_or(false);

        let connection = ConnectionParams::Params {
            host,
            port,
            username: var("USER"),
            password: var("PASSWORD"),
            database: database.clone(),
            ssl,
        };
        tracing::debug!(
            "Bootstrapped {} database '{}' from {}_*",
            family.provider,
            database,
            family.prefix
        );
        configs.push(DatabaseConfig::new(database, family.provider.clone(), connection));
    }

    if let Some(path) = env.var("SQLITE_PATH") {
        let name = Path::new(&path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("sqlite")
            .to_string();
        let url = if path.starts_with("file:") {
            path
        } else {
            format!("file:{}", path)
        };
        configs.push(DatabaseConfig::with_url(name, Provider::SQLite, url));
    }

    if let Some(url) = env.var("MONGODB_URL") {
        let name = env.var("MONGODB_DATABASE").unwrap_or_else(|| "mongodb".to_string());
        configs.push(DatabaseConfig::with_url(name, Provider::MongoDB, url));
    }

    configs
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on" | "require")
}
