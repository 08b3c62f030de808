//! Client discovery
//!
//! Scans the clients root for one subdirectory per logical database. A
//! candidate is usable when its entry module (`client.toml`) loads and names a
//! client factory registered in the [`FactoryTable`]. Scanning never touches
//! the registry; [`ClientRegistry::auto_register_clients`] consumes the result.
//!
//! [`ClientRegistry::auto_register_clients`]: crate::ClientRegistry::auto_register_clients

pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::FactoryTable;
use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::provider::Provider;

pub use schema::{DatasourceProviderExtractor, ProviderExtractor};

/// File name of a client's entry module
pub const ENTRY_MODULE: &str = "client.toml";

/// Reason recorded for directories without an entry module
pub const ENTRY_MODULE_NOT_FOUND: &str = "entry module not found";

/// Result of inspecting one candidate directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredClient {
    pub name: String,
    pub path: PathBuf,
    pub schema_path: Option<PathBuf>,
    pub provider: Option<Provider>,
    /// Factory named by the entry module
    pub factory: Option<String>,
    pub is_valid: bool,
    pub error: Option<String>,
}

impl DiscoveredClient {
    fn invalid(name: &str, path: &Path, error: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            schema_path: None,
            provider: None,
            factory: None,
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

/// Contents of a client's `client.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientManifest {
    /// Registered client factory used to construct the handle
    pub factory: Option<String>,
    /// Fallback provider when the schema declares none
    pub provider: Option<Provider>,
    /// Schema path relative to the client directory
    pub schema: Option<PathBuf>,
}

impl ClientManifest {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        toml::from_str(&content).map_err(|e| format!("invalid {}: {}", ENTRY_MODULE, e))
    }
}

/// Filesystem scanner for client directories
#[derive(Clone)]
pub struct ClientDiscovery {
    clients_root: PathBuf,
    schemas_root: PathBuf,
    factories: Arc<FactoryTable>,
    extractor: Arc<dyn ProviderExtractor>,
    timeout: Duration,
}

impl ClientDiscovery {
    pub fn new(
        clients_root: impl Into<PathBuf>,
        schemas_root: impl Into<PathBuf>,
        factories: Arc<FactoryTable>,
    ) -> Self {
        Self {
            clients_root: clients_root.into(),
            schemas_root: schemas_root.into(),
            factories,
            extractor: Arc::new(DatasourceProviderExtractor),
            timeout: Duration::from_secs(2),
        }
    }

    pub fn from_config(config: &HubConfig, factories: Arc<FactoryTable>) -> Self {
        Self::new(&config.clients_root, &config.schemas_root, factories)
            .with_timeout(config.discovery_timeout())
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ProviderExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Per-candidate inspection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn clients_root(&self) -> &Path {
        &self.clients_root
    }

    /// Scan the clients root and build a fresh snapshot keyed by name
    pub async fn scan(&self) -> HubResult<BTreeMap<String, DiscoveredClient>> {
        if !self.clients_root.is_dir() {
            return Err(HubError::DiscoveryRootMissing {
                path: self.clients_root.clone(),
            });
        }

        let candidates = self.candidates()?;
        let schema_files = Arc::new(schema::list_schema_files(&self.schemas_root));
        let mut snapshot = BTreeMap::new();

        for (name, path) in candidates {
            let this = self.clone();
            let files = Arc::clone(&schema_files);
            let (task_name, task_path) = (name.clone(), path.clone());
            let task =
                tokio::task::spawn_blocking(move || this.inspect(&task_name, &task_path, &files));

            let client = match tokio::time::timeout(self.timeout, task).await {
                Ok(Ok(client)) => client,
                Ok(Err(e)) => {
                    DiscoveredClient::invalid(&name, &path, format!("inspection failed: {}", e))
                }
                Err(_) => {
                    let timeout = HubError::Timeout {
                        database: name.clone(),
                        timeout: self.timeout,
                    };
                    DiscoveredClient::invalid(&name, &path, timeout.to_string())
                }
            };

            if client.is_valid {
                tracing::debug!("Discovered client '{}' at {}", name, path.display());
            } else {
                tracing::warn!(
                    "Client '{}' is not usable: {}",
                    name,
                    client.error.as_deref().unwrap_or("unknown error")
                );
            }
            snapshot.insert(name, client);
        }

        tracing::info!(
            "Discovery found {} client(s), {} valid",
            snapshot.len(),
            snapshot.values().filter(|c| c.is_valid).count()
        );
        Ok(snapshot)
    }

    /// Immediate subdirectories of the clients root, sorted by name
    fn candidates(&self) -> HubResult<Vec<(String, PathBuf)>> {
        let mut candidates = Vec::new();
        for entry in std::fs::read_dir(&self.clients_root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if !name.starts_with('.') => candidates.push((name, path)),
                Ok(_) => {}
                Err(raw) => tracing::warn!("Skipping non UTF-8 client directory {:?}", raw),
            }
        }
        candidates.sort();
        Ok(candidates)
    }

    fn inspect(&self, name: &str, dir: &Path, schema_files: &[PathBuf]) -> DiscoveredClient {
        let entry = dir.join(ENTRY_MODULE);
        if !entry.is_file() {
            return DiscoveredClient::invalid(name, dir, ENTRY_MODULE_NOT_FOUND);
        }

        let manifest = ClientManifest::load(&entry);
        let declared_schema = manifest.as_ref().ok().and_then(|m| m.schema.clone());

        let schema_path = colocated_schema(dir, declared_schema.as_deref())
            .or_else(|| schema::match_schema_file(name, schema_files));

        let mut provider = schema_path
            .as_deref()
            .and_then(|path| self.extractor.extract_from_file(path));
        if provider.is_none() {
            provider = manifest.as_ref().ok().and_then(|m| m.provider.clone());
        }

        let mut client = DiscoveredClient {
            name: name.to_string(),
            path: dir.to_path_buf(),
            schema_path,
            provider,
            factory: None,
            is_valid: false,
            error: None,
        };

        match manifest {
            Err(message) => client.error = Some(message),
            Ok(ClientManifest { factory: None, .. }) => {
                client.error = Some("entry module does not declare a client factory".to_string());
            }
            Ok(ClientManifest {
                factory: Some(factory),
                ..
            }) => {
                if self.factories.contains(&factory) {
                    client.is_valid = true;
                } else {
                    client.error = Some(format!("client factory '{}' is not registered", factory));
                }
                client.factory = Some(factory);
            }
        }

        client
    }
}

impl std::fmt::Debug for ClientDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientDiscovery")
            .field("clients_root", &self.clients_root)
            .field("schemas_root", &self.schemas_root)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn colocated_schema(dir: &Path, declared: Option<&Path>) -> Option<PathBuf> {
    if let Some(declared) = declared {
        let path = dir.join(declared);
        if path.is_file() {
            return Some(path);
        }
        tracing::warn!("Declared schema {} does not exist", path.display());
    }

    schema::COLOCATED_SCHEMAS
        .iter()
        .map(|relative| dir.join(relative))
        .find(|path| path.is_file())
}
