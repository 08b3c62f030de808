//! Database health probing
//!
//! A probe connects through the registry (reusing the memoized handle) and
//! pings it under a timeout. Probes never fail: errors and timeouts are
//! reported as unhealthy.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};

use crate::config::HubConfig;
use crate::error::HubError;
use crate::registry::ClientRegistry;

/// Result of probing one database
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    /// Round trip completed
    Healthy { latency: Duration },
    /// Connection, ping or timeout failure
    Unhealthy { reason: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy { latency } => write!(f, "HEALTHY ({}ms)", latency.as_millis()),
            HealthStatus::Unhealthy { reason } => write!(f, "UNHEALTHY: {}", reason),
        }
    }
}

/// Concurrent connectivity probes over every registered database
#[derive(Debug, Clone)]
pub struct HealthChecker {
    registry: Arc<ClientRegistry>,
    probe_timeout: Duration,
    max_concurrency: usize,
}

impl HealthChecker {
    pub fn new(registry: Arc<ClientRegistry>, probe_timeout: Duration) -> Self {
        Self {
            registry,
            probe_timeout,
            max_concurrency: 8,
        }
    }

    pub fn from_config(config: &HubConfig, registry: Arc<ClientRegistry>) -> Self {
        Self::new(registry, config.probe_timeout()).with_max_concurrency(config.max_concurrency)
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Healthy flag per database
    pub async fn check(&self) -> BTreeMap<String, bool> {
        self.check_detailed()
            .await
            .into_iter()
            .map(|(name, status)| (name, status.is_healthy()))
            .collect()
    }

    /// Status per database, with latency or failure reason
    pub async fn check_detailed(&self) -> BTreeMap<String, HealthStatus> {
        stream::iter(self.registry.all_database_names())
            .map(|name| async move {
                let status = self.probe(&name).await;
                (name, status)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await
    }

    /// Probe a single database
    pub async fn probe(&self, name: &str) -> HealthStatus {
        let started = Instant::now();
        let attempt = async {
            let client = self.registry.get_client(name).await?;
            client.ping().await
        };

        let status = match tokio::time::timeout(self.probe_timeout, attempt).await {
            Ok(Ok(())) => HealthStatus::Healthy {
                latency: started.elapsed(),
            },
            Ok(Err(e)) => HealthStatus::Unhealthy { reason: e.to_string() },
            Err(_) => HealthStatus::Unhealthy {
                reason: HubError::Timeout {
                    database: name.to_string(),
                    timeout: self.probe_timeout,
                }
                .to_string(),
            },
        };

        tracing::debug!("Health probe for '{}': {}", name, status);
        status
    }
}
