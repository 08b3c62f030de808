//! sqlx-backed client factory
//!
//! Uses sqlx's `Any` driver so PostgreSQL, CockroachDB, MySQL and SQLite share
//! one implementation. SQL Server and MongoDB have no sqlx driver and fail to
//! connect with a descriptive error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use super::{ClientFactory, DatabaseClient};
use crate::config::{DatabaseConfig, LogCategory};
use crate::error::{HubError, HubResult};
use crate::provider::Provider;

/// Pool settings applied to every sqlx client
#[derive(Debug, Clone)]
pub struct SqlxPoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: Option<u64>,
}

impl Default for SqlxPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 0,
            acquire_timeout_seconds: 10,
            idle_timeout_seconds: Some(300),
        }
    }
}

/// Factory producing [`SqlxClient`]s
#[derive(Debug, Clone, Default)]
pub struct SqlxClientFactory {
    pool_config: SqlxPoolConfig,
}

#[async_trait]
impl ClientFactory for SqlxClientFactory {
    async fn connect(
        &self,
        config: &DatabaseConfig,
        url: &str,
    ) -> HubResult<Arc<dyn DatabaseClient>> {
        if !supports(&config.provider) {
            return Err(HubError::connection(
                &config.name,
                format!("no sqlx driver for provider '{}'", config.provider),
            ));
        }

        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new()
            .max_connections(self.pool_config.max_connections)
            .min_connections(self.pool_config.min_connections)
            .acquire_timeout(Duration::from_secs(self.pool_config.acquire_timeout_seconds));

        if let Some(idle_timeout) = self.pool_config.idle_timeout_seconds {
            options = options.idle_timeout(Duration::from_secs(idle_timeout));
        }

        let pool = options.connect(&driver_url(url)).await.map_err(|e| {
            tracing::error!("Failed to connect to '{}': {}", config.name, e);
            HubError::connection(&config.name, e)
        })?;

        tracing::info!("Connected to database '{}' ({})", config.name, config.provider);
        Ok(Arc::new(SqlxClient {
            name: config.name.clone(),
            pool,
            log_queries: config.logs(LogCategory::Query),
        }))
    }
}

/// Client wrapping a sqlx `AnyPool`
pub struct SqlxClient {
    name: String,
    pool: AnyPool,
    log_queries: bool,
}

impl SqlxClient {
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseClient for SqlxClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> HubResult<()> {
        if self.log_queries {
            tracing::info!(database = %self.name, "SELECT 1");
        }
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| HubError::connection(&self.name, e))?;
        Ok(())
    }

    async fn disconnect(&self) -> HubResult<()> {
        self.pool.close().await;
        tracing::debug!("Closed pool for '{}'", self.name);
        Ok(())
    }
}

fn supports(provider: &Provider) -> bool {
    matches!(
        provider,
        Provider::PostgreSQL | Provider::CockroachDB | Provider::MySQL | Provider::SQLite
    )
}

/// sqlx expects `sqlite:` where schema files use `file:`
fn driver_url(url: &str) -> String {
    match url.strip_prefix("file:") {
        Some(path) => format!("sqlite:{}", path),
        None => url.to_string(),
    }
}
