use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use dbhub::config::bootstrap;
use dbhub::{
    BulkFailurePolicy, ClientDiscovery, ClientRegistry, CommandMigrationTool, ConfigResolver,
    FactoryTable, HealthChecker, HubConfig, MigrationOrchestrator, ProcessEnv,
};

/// Flags accepted by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (defaults to ./dbhub.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory with one subdirectory per client
    #[arg(long, global = true)]
    pub clients_root: Option<PathBuf>,

    /// Directory with schema files
    #[arg(long, global = true)]
    pub schemas_root: Option<PathBuf>,

    /// When a bulk command exits non-zero: any (some database failed) or all
    #[arg(long, global = true, default_value = "any")]
    pub fail_on: BulkFailurePolicy,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Machine-readable output
    #[arg(long, global = true)]
    pub json: bool,
}

/// Everything a command needs, assembled once per process
pub struct Hub {
    pub config: HubConfig,
    pub registry: Arc<ClientRegistry>,
    pub discovery: ClientDiscovery,
    pub orchestrator: MigrationOrchestrator,
    pub health: HealthChecker,
    pub policy: BulkFailurePolicy,
    pub json: bool,
}

impl Hub {
    pub fn open(args: &GlobalArgs) -> anyhow::Result<Self> {
        let mut config = HubConfig::load(args.config.as_deref(), &ProcessEnv)
            .context("failed to load configuration")?;
        if let Some(root) = &args.clients_root {
            config.clients_root = root.clone();
        }
        if let Some(root) = &args.schemas_root {
            config.schemas_root = root.clone();
        }

        let factories = Arc::new(FactoryTable::with_defaults());
        let registry = Arc::new(ClientRegistry::from_config(
            &config,
            Arc::clone(&factories),
            ConfigResolver::from_process_env(),
        ));

        for database in bootstrap::from_env(&ProcessEnv) {
            if registry.has_database(&database.name) {
                tracing::debug!(
                    "'{}' is declared in the configuration file, ignoring environment",
                    database.name
                );
                continue;
            }
            registry.add_database(database);
        }

        let discovery = ClientDiscovery::from_config(&config, factories);
        let orchestrator = MigrationOrchestrator::from_config(
            &config,
            Arc::clone(&registry),
            Arc::new(CommandMigrationTool::from_config(&config)),
        );
        let health = HealthChecker::from_config(&config, Arc::clone(&registry));

        Ok(Self {
            config,
            registry,
            discovery,
            orchestrator,
            health,
            policy: args.fail_on,
            json: args.json,
        })
    }

    /// Scan the clients root and register every usable client
    pub async fn register_discovered(&self) -> anyhow::Result<Vec<String>> {
        self.registry
            .auto_register_clients(&self.discovery)
            .await
            .context("client discovery failed")
    }

    /// Release every live handle
    pub async fn close(&self) {
        for outcome in self.registry.disconnect_all().await {
            if let Some(error) = outcome.error {
                tracing::warn!("Disconnecting '{}' failed: {}", outcome.name, error);
            }
        }
    }
}
