//! # dbhub: multi-database registry and migration orchestration
//!
//! Manages several logical databases side by side. Each database is either
//! declared explicitly or discovered from a clients directory, gets its
//! connection URL resolved from the environment (falling back to a per-provider
//! default), and is connected lazily through a registered [`ClientFactory`].
//! Migration lifecycle operations are delegated to an external tool per
//! database, one at a time, and bulk runs keep going past individual failures.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dbhub::{
//!     ClientDiscovery, ClientRegistry, ConfigResolver, FactoryTable, HealthChecker, HubConfig,
//! };
//!
//! # async fn example() -> dbhub::HubResult<()> {
//! let config = HubConfig::default();
//! let factories = Arc::new(FactoryTable::with_defaults());
//! let registry = Arc::new(ClientRegistry::from_config(
//!     &config,
//!     Arc::clone(&factories),
//!     ConfigResolver::from_process_env(),
//! ));
//!
//! let discovery = ClientDiscovery::from_config(&config, factories);
//! registry.auto_register_clients(&discovery).await?;
//!
//! let health = HealthChecker::from_config(&config, registry).check().await;
//! # let _ = health;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod migrations;
pub mod provider;
pub mod registry;

pub use client::{ClientFactory, DatabaseClient, FactoryTable, SQLX_FACTORY};
pub use config::{
    ConfigResolver, ConnectionParams, DatabaseConfig, EnvSource, HubConfig, LogCategory, MapEnv,
    ProcessEnv, ResolvedTarget,
};
pub use discovery::{ClientDiscovery, DiscoveredClient, ProviderExtractor};
pub use error::{HubError, HubResult};
pub use health::{HealthChecker, HealthStatus};
pub use migrations::{
    BulkFailurePolicy, BulkOutcome, BulkReport, CommandMigrationTool, Confirm, Confirmation,
    MigrationJobConfig, MigrationOrchestrator, MigrationTool, ResetOutcome,
};
pub use provider::Provider;
pub use registry::{ClientRegistry, DisconnectOutcome};
