//! Connection target resolution
//!
//! Precedence, first match wins:
//! 1. `{NAME}_DATABASE_URL`
//! 2. `{NAME}_URL`
//! 3. `DATABASE_URL_{NAME}`
//! 4. `DATABASE_URL`
//! 5. the provider's default template
//!
//! `{NAME}` is the database name uppercased, with every character that is not
//! ASCII alphanumeric replaced by `_`.

use std::sync::Arc;

use super::sources::{ConfigSource, EnvSource, ProcessEnv};
use crate::error::{HubError, HubResult};
use crate::provider::Provider;

/// A resolved connection target and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub url: String,
    pub source: ConfigSource,
}

/// Derives connection URLs for logical databases
#[derive(Clone)]
pub struct ConfigResolver {
    env: Arc<dyn EnvSource>,
}

impl ConfigResolver {
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self { env }
    }

    /// Resolver reading the real process environment
    pub fn from_process_env() -> Self {
        Self::new(Arc::new(ProcessEnv))
    }

    /// Environment variable candidates for `name`, in precedence order
    pub fn candidate_vars(name: &str) -> [String; 4] {
        let upper = env_key(name);
        [
            format!("{}_DATABASE_URL", upper),
            format!("{}_URL", upper),
            format!("DATABASE_URL_{}", upper),
            "DATABASE_URL".to_string(),
        ]
    }

    /// Resolve the connection target for `name`
    pub fn resolve(&self, name: &str, provider: &Provider) -> HubResult<ResolvedTarget> {
        for var in Self::candidate_vars(name) {
            if let Some(url) = self.env.var(&var) {
                tracing::info!("Resolved connection for '{}' from {}", name, var);
                return Ok(ResolvedTarget {
                    url,
                    source: ConfigSource::EnvVar(var),
                });
            }
        }

        match provider.default_url(name) {
            Some(url) => {
                tracing::debug!("Using default {} template for '{}'", provider, name);
                Ok(ResolvedTarget {
                    url,
                    source: ConfigSource::Default(provider.to_string()),
                })
            }
            None => Err(HubError::UnsupportedProvider {
                provider: provider.to_string(),
                database: name.to_string(),
            }),
        }
    }

    /// Resolve and return only the URL
    pub fn resolve_url(&self, name: &str, provider: &Provider) -> HubResult<String> {
        self.resolve(name, provider).map(|target| target.url)
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver").finish_non_exhaustive()
    }
}

/// Environment key fragment for a database name
pub fn env_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sources::MapEnv;

    fn resolver(env: MapEnv) -> ConfigResolver {
        ConfigResolver::new(Arc::new(env))
    }

    #[test]
    fn test_env_key() {
        assert_eq!(env_key("orders"), "ORDERS");
        assert_eq!(env_key("user-events.v2"), "USER_EVENTS_V2");
    }

    #[test]
    fn test_precedence_order() {
        let env = MapEnv::new()
            .with("DATABASE_URL", "generic")
            .with("DATABASE_URL_ORDERS", "suffixed")
            .with("ORDERS_URL", "short")
            .with("ORDERS_DATABASE_URL", "specific");
        let target = resolver(env.clone()).resolve("orders", &Provider::PostgreSQL).unwrap();
        assert_eq!(target.url, "specific");
        assert_eq!(target.source, ConfigSource::EnvVar("ORDERS_DATABASE_URL".into()));

        let env = env.with("ORDERS_DATABASE_URL", "");
        assert_eq!(
            resolver(env.clone()).resolve_url("orders", &Provider::PostgreSQL).unwrap(),
            "short"
        );

        let env = env.with("ORDERS_URL", "");
        assert_eq!(
            resolver(env.clone()).resolve_url("orders", &Provider::PostgreSQL).unwrap(),
            "suffixed"
        );

        let env = env.with("DATABASE_URL_ORDERS", "");
        assert_eq!(resolver(env).resolve_url("orders", &Provider::PostgreSQL).unwrap(), "generic");
    }

    #[test]
    fn test_generic_database_url_fallback() {
        let env = MapEnv::new().with("DATABASE_URL", "postgres://x");
        let url = resolver(env).resolve_url("orders", &Provider::PostgreSQL).unwrap();
        assert_eq!(url, "postgres://x");
    }

    #[test]
    fn test_default_template_for_every_known_provider() {
        let resolver = resolver(MapEnv::new());
        for provider in [
            Provider::PostgreSQL,
            Provider::MySQL,
            Provider::SQLite,
            Provider::SqlServer,
            Provider::MongoDB,
            Provider::CockroachDB,
        ] {
            let target = resolver.resolve("billing", &provider).unwrap();
            assert!(!target.url.is_empty());
            assert!(target.source.is_default());
        }
    }

    #[test]
    fn test_unsupported_provider_only_without_env() {
        let provider = Provider::Other("redis".into());
        let err = resolver(MapEnv::new()).resolve("cache", &provider).unwrap_err();
        assert!(matches!(err, HubError::UnsupportedProvider { .. }));

        let env = MapEnv::new().with("CACHE_URL", "redis://localhost");
        let target = resolver(env).resolve("cache", &provider).unwrap();
        assert_eq!(target.url, "redis://localhost");
        assert!(target.source.is_env_var());
    }
}
