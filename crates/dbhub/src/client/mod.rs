//! Client capability interfaces
//!
//! A [`ClientFactory`] turns a [`DatabaseConfig`] and a resolved URL into a
//! connected [`DatabaseClient`]. Factories are registered by name in a
//! [`FactoryTable`]; client manifests refer to them by that name.

pub mod sqlx_any;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DatabaseConfig;
use crate::error::HubResult;

pub use sqlx_any::{SqlxClient, SqlxClientFactory, SqlxPoolConfig};

/// Name of the bundled sqlx factory
pub const SQLX_FACTORY: &str = "sqlx";

/// A live, connected client for one logical database
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Logical database name this client is bound to
    fn name(&self) -> &str;

    /// Trivial round trip to the database
    async fn ping(&self) -> HubResult<()>;

    /// Release the underlying connections
    async fn disconnect(&self) -> HubResult<()>;
}

/// Constructor for database clients
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(
        &self,
        config: &DatabaseConfig,
        url: &str,
    ) -> HubResult<Arc<dyn DatabaseClient>>;
}

/// Registration table of client factories
#[derive(Clone, Default)]
pub struct FactoryTable {
    factories: BTreeMap<String, Arc<dyn ClientFactory>>,
}

impl FactoryTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the bundled sqlx factory registered
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register(SQLX_FACTORY, Arc::new(SqlxClientFactory::default()));
        table
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn ClientFactory>) {
        let name = name.into();
        tracing::debug!("Registering client factory: {}", name);
        self.factories.insert(name, factory);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ClientFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for FactoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryTable")
            .field("factories", &self.names())
            .finish()
    }
}
