//! Client registry
//!
//! The single source of truth for which logical databases exist. Holds the
//! manually declared [`DatabaseConfig`]s (in insertion order), the latest
//! discovery snapshot, and the lazily connected client handles.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use tokio::sync::OnceCell;

use crate::client::{DatabaseClient, FactoryTable, SQLX_FACTORY};
use crate::config::{ConfigResolver, DatabaseConfig, HubConfig};
use crate::discovery::{ClientDiscovery, DiscoveredClient};
use crate::error::{HubError, HubResult};
use crate::provider::Provider;

type HandleSlot = Arc<OnceCell<Arc<dyn DatabaseClient>>>;

/// Outcome of disposing one handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub name: String,
    pub error: Option<String>,
}

/// Registry of logical databases and their live handles
pub struct ClientRegistry {
    configs: RwLock<Vec<DatabaseConfig>>,
    discovered: RwLock<BTreeMap<String, DiscoveredClient>>,
    handles: DashMap<String, HandleSlot>,
    factories: Arc<FactoryTable>,
    resolver: ConfigResolver,
    default_factory: String,
    default_database: Option<String>,
    max_concurrency: usize,
}

impl ClientRegistry {
    pub fn new(factories: Arc<FactoryTable>, resolver: ConfigResolver) -> Self {
        Self {
            configs: RwLock::new(Vec::new()),
            discovered: RwLock::new(BTreeMap::new()),
            handles: DashMap::new(),
            factories,
            resolver,
            default_factory: SQLX_FACTORY.to_string(),
            default_database: None,
            max_concurrency: 8,
        }
    }

    /// Registry seeded with the databases declared in `config`
    pub fn from_config(
        config: &HubConfig,
        factories: Arc<FactoryTable>,
        resolver: ConfigResolver,
    ) -> Self {
        let mut registry = Self::new(factories, resolver);
        registry.default_factory = config.default_factory.clone();
        registry.default_database = config.default_database.clone();
        registry.max_concurrency = config.max_concurrency.max(1);
        for database in &config.databases {
            registry.add_database(database.clone());
        }
        registry
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn factories(&self) -> &FactoryTable {
        &self.factories
    }

    /// Insert or replace the configuration for `config.name`
    ///
    /// A replaced entry keeps its original position.
    pub fn add_database(&self, config: DatabaseConfig) {
        let mut configs = self.configs.write();
        match configs.iter_mut().find(|existing| existing.name == config.name) {
            Some(existing) => {
                tracing::debug!("Replacing database configuration '{}'", config.name);
                *existing = config;
            }
            None => {
                tracing::info!("Registered database '{}' ({})", config.name, config.provider);
                configs.push(config);
            }
        }
    }

    pub fn get_config(&self, name: &str) -> Option<DatabaseConfig> {
        self.configs.read().iter().find(|c| c.name == name).cloned()
    }

    /// Manually registered names, in insertion order
    pub fn get_database_names(&self) -> Vec<String> {
        self.configs.read().iter().map(|c| c.name.clone()).collect()
    }

    /// Manual names followed by valid discovered names not already registered
    pub fn all_database_names(&self) -> Vec<String> {
        let mut names = self.get_database_names();
        let discovered = self.discovered.read();
        for (name, client) in discovered.iter() {
            if client.is_valid && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.get_config(name).is_some()
            || self.discovered_client(name).map_or(false, |c| c.is_valid)
    }

    /// Configured default if known, otherwise the first registration
    pub fn default_database(&self) -> Option<String> {
        match &self.default_database {
            Some(name) if self.has_database(name) => Some(name.clone()),
            _ => self.all_database_names().into_iter().next(),
        }
    }

    /// Replace the discovery snapshot wholesale
    pub fn set_discovered(&self, snapshot: BTreeMap<String, DiscoveredClient>) {
        *self.discovered.write() = snapshot;
    }

    pub fn discovered(&self) -> BTreeMap<String, DiscoveredClient> {
        self.discovered.read().clone()
    }

    pub fn discovered_client(&self, name: &str) -> Option<DiscoveredClient> {
        self.discovered.read().get(name).cloned()
    }

    /// Effective provider of a known database
    pub fn provider_of(&self, name: &str) -> HubResult<Provider> {
        if let Some(config) = self.get_config(name) {
            return Ok(config.provider);
        }
        match self.discovered_client(name) {
            Some(client) if client.is_valid => Ok(client.provider.unwrap_or_default()),
            _ => Err(HubError::not_found(name)),
        }
    }

    /// Configuration and URL used to connect `name`
    pub fn connection_target(&self, name: &str) -> HubResult<(DatabaseConfig, String)> {
        if let Some(config) = self.get_config(name) {
            let url = config.connection_url()?;
            return Ok((config, url));
        }

        match self.discovered_client(name) {
            Some(client) if client.is_valid => {
                let provider = client.provider.unwrap_or_default();
                let url = self.resolver.resolve_url(name, &provider)?;
                let mut config = DatabaseConfig::with_url(name, provider, url.clone());
                config.factory = client.factory;
                Ok((config, url))
            }
            _ => Err(HubError::not_found(name)),
        }
    }

    /// Memoized live handle for `name`, connecting on first use
    ///
    /// Concurrent first calls for the same name share a single connection
    /// attempt. A failed attempt leaves no handle behind.
    pub async fn get_client(&self, name: &str) -> HubResult<Arc<dyn DatabaseClient>> {
        let (config, url) = self.connection_target(name)?;

        let slot: HandleSlot = self
            .handles
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let client = slot
            .get_or_try_init(|| async {
                let factory_name = config.factory.as_deref().unwrap_or(&self.default_factory);
                let factory = self.factories.get(factory_name).ok_or_else(|| {
                    HubError::configuration(format!(
                        "client factory '{}' for '{}' is not registered",
                        factory_name, name
                    ))
                })?;
                tracing::debug!("Connecting '{}' via factory '{}'", name, factory_name);
                factory.connect(&config, &url).await
            })
            .await?;

        Ok(Arc::clone(client))
    }

    /// Whether a live handle exists for `name`
    pub fn is_connected(&self, name: &str) -> bool {
        self.handles
            .get(name)
            .map_or(false, |slot| slot.initialized())
    }

    /// Dispose the handle for `name`, if any
    pub async fn disconnect(&self, name: &str) -> HubResult<()> {
        let Some((_, slot)) = self.handles.remove(name) else {
            return Ok(());
        };
        match slot.get() {
            Some(client) => client.disconnect().await,
            None => Ok(()),
        }
    }

    /// Dispose every handle concurrently
    ///
    /// A failure for one handle does not stop the others; every attempt is
    /// awaited and reported.
    pub async fn disconnect_all(&self) -> Vec<DisconnectOutcome> {
        let names: Vec<String> = self.handles.iter().map(|entry| entry.key().clone()).collect();

        let mut outcomes: Vec<DisconnectOutcome> = stream::iter(names)
            .map(|name| async move {
                let error = match self.disconnect(&name).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!("Failed to disconnect '{}': {}", name, e);
                        Some(e.to_string())
                    }
                };
                DisconnectOutcome { name, error }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        outcomes
    }

    /// Scan, then register every valid discovered client
    ///
    /// Invalid clients and clients whose connection target cannot be resolved
    /// are logged and skipped. Returns the names registered.
    pub async fn auto_register_clients(
        &self,
        discovery: &ClientDiscovery,
    ) -> HubResult<Vec<String>> {
        let snapshot = discovery.scan().await?;
        let mut registered = Vec::new();

        for client in snapshot.values() {
            if !client.is_valid {
                tracing::warn!(
                    "Skipping client '{}': {}",
                    client.name,
                    client.error.as_deref().unwrap_or("invalid")
                );
                continue;
            }

            let provider = client.provider.clone().unwrap_or_default();
            let url = match self.resolver.resolve_url(&client.name, &provider) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping client '{}': {}", client.name, e);
                    continue;
                }
            };

            let mut config = DatabaseConfig::with_url(&client.name, provider, url);
            config.factory = client.factory.clone();
            self.add_database(config);
            registered.push(client.name.clone());
        }

        self.set_discovered(snapshot);
        Ok(registered)
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("databases", &self.get_database_names())
            .field("connected", &self.handles.len())
            .finish_non_exhaustive()
    }
}
