//! Migration orchestration across registered databases
//!
//! Maps each logical database to its schema file and migrations directory and
//! dispatches lifecycle operations to a [`MigrationTool`]. Single-database
//! operations propagate errors; bulk operations run sequentially in registry
//! order and record every outcome in a [`BulkReport`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;

use super::bulk::{BulkOutcome, BulkReport};
use super::manager::{self, MigrationFile};
use super::tool::{MigrationCommand, MigrationInvocation, MigrationTool, ToolOutput};
use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::registry::ClientRegistry;

/// Schema and migrations location of one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationJobConfig {
    pub name: String,
    pub schema_path: PathBuf,
    pub migrations_dir: PathBuf,
}

/// Interactive approval of a destructive operation
#[async_trait]
pub trait Confirm: Send + Sync {
    /// `Ok(true)` only when the operator approved resetting `database`
    async fn confirm(&self, database: &str) -> HubResult<bool>;
}

/// How a reset gets approved
#[derive(Clone)]
pub enum Confirmation {
    /// Skip the prompt
    Forced,
    Prompt(Arc<dyn Confirm>),
}

impl std::fmt::Debug for Confirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confirmation::Forced => write!(f, "Forced"),
            Confirmation::Prompt(_) => write!(f, "Prompt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Completed(ToolOutput),
    /// Declined or unconfirmed; the tool was not invoked
    Cancelled,
}

/// Tool-reported status plus the migrations found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub database: String,
    pub output: ToolOutput,
    pub local: Vec<MigrationFile>,
}

pub struct MigrationOrchestrator {
    registry: Arc<ClientRegistry>,
    tool: Arc<dyn MigrationTool>,
    schemas_root: PathBuf,
    jobs: DashMap<String, MigrationJobConfig>,
}

impl MigrationOrchestrator {
    pub fn new(
        registry: Arc<ClientRegistry>,
        tool: Arc<dyn MigrationTool>,
        schemas_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            tool,
            schemas_root: schemas_root.into(),
            jobs: DashMap::new(),
        }
    }

    pub fn from_config(
        config: &HubConfig,
        registry: Arc<ClientRegistry>,
        tool: Arc<dyn MigrationTool>,
    ) -> Self {
        Self::new(registry, tool, &config.schemas_root)
    }

    /// Pin the schema and migrations locations of a database
    pub fn configure(&self, job: MigrationJobConfig) {
        tracing::debug!(
            "Configured '{}': schema {}, migrations {}",
            job.name,
            job.schema_path.display(),
            job.migrations_dir.display()
        );
        self.jobs.insert(job.name.clone(), job);
    }

    /// Job configuration of `name`, derived on first use
    ///
    /// The schema is the discovered client's schema when there is one, else
    /// `{schemas_root}/{provider}.prisma`. Migrations live in the
    /// `migrations` directory beside the schema, where the tool reads them.
    pub fn job_config(&self, name: &str) -> HubResult<MigrationJobConfig> {
        if let Some(job) = self.jobs.get(name) {
            return Ok(job.clone());
        }
        if !self.registry.has_database(name) {
            return Err(HubError::not_found(name));
        }

        let discovered_schema = self
            .registry
            .discovered_client(name)
            .and_then(|client| client.schema_path);
        let schema_path = match discovered_schema {
            Some(path) => path,
            None => {
                let provider = self.registry.provider_of(name)?;
                self.schemas_root.join(format!("{}.prisma", provider.as_str()))
            }
        };

        let job = MigrationJobConfig {
            name: name.to_string(),
            migrations_dir: migrations_dir_for(&schema_path),
            schema_path,
        };
        Ok(self.jobs.entry(name.to_string()).or_insert(job).clone())
    }

    /// Write a timestamped placeholder migration for `name`
    pub fn create_migration(&self, name: &str, label: &str) -> HubResult<PathBuf> {
        let job = self.job_config(name)?;
        manager::create_migration(&job.migrations_dir, name, label)
    }

    /// Apply pending migrations to `name`
    pub async fn run_migrations(&self, name: &str, label: Option<&str>) -> HubResult<ToolOutput> {
        let command = MigrationCommand::Dev {
            label: label.map(str::to_string),
        };
        self.invoke(name, &command).await
    }

    pub async fn run_all_migrations(&self, label: Option<&str>) -> BulkReport {
        let command = MigrationCommand::Dev {
            label: label.map(str::to_string),
        };
        self.bulk("migrate", &command).await
    }

    pub async fn get_status(&self, name: &str) -> HubResult<MigrationStatus> {
        let output = self.invoke(name, &MigrationCommand::Status).await?;
        let job = self.job_config(name)?;
        Ok(MigrationStatus {
            database: name.to_string(),
            output,
            local: manager::list_migrations(&job.migrations_dir)?,
        })
    }

    pub async fn push_schema(&self, name: &str) -> HubResult<ToolOutput> {
        self.invoke(name, &MigrationCommand::Push).await
    }

    pub async fn generate_client(&self, name: &str) -> HubResult<ToolOutput> {
        self.invoke(name, &MigrationCommand::Generate).await
    }

    pub async fn generate_all_clients(&self) -> BulkReport {
        self.bulk("generate", &MigrationCommand::Generate).await
    }

    /// Launch the schema browser attached to the terminal
    pub async fn open_studio(&self, name: &str) -> HubResult<()> {
        self.invoke(name, &MigrationCommand::Studio).await.map(|_| ())
    }

    pub async fn seed(&self, name: &str) -> HubResult<ToolOutput> {
        self.invoke(name, &MigrationCommand::Seed).await
    }

    pub async fn seed_all(&self) -> BulkReport {
        self.bulk("seed", &MigrationCommand::Seed).await
    }

    /// Drop and recreate `name`, then reapply its migrations
    ///
    /// Nothing runs unless `confirmation` approves it. A failed prompt counts
    /// as a refusal.
    pub async fn reset_database(
        &self,
        name: &str,
        confirmation: Confirmation,
    ) -> HubResult<ResetOutcome> {
        self.job_config(name)?;

        let approved = match confirmation {
            Confirmation::Forced => true,
            Confirmation::Prompt(prompt) => match prompt.confirm(name).await {
                Ok(approved) => approved,
                Err(e) => {
                    tracing::warn!("Confirmation for resetting '{}' failed: {}", name, e);
                    false
                }
            },
        };

        if !approved {
            tracing::info!("Reset of '{}' cancelled", name);
            return Ok(ResetOutcome::Cancelled);
        }

        tracing::warn!("Resetting database '{}'", name);
        self.invoke(name, &MigrationCommand::Reset)
            .await
            .map(ResetOutcome::Completed)
    }

    async fn invoke(&self, name: &str, command: &MigrationCommand) -> HubResult<ToolOutput> {
        let job = self.job_config(name)?;
        ensure_schema(&job.schema_path)?;
        let (_, url) = self.registry.connection_target(name)?;

        let invocation = MigrationInvocation {
            database: name,
            command,
            schema_path: &job.schema_path,
            database_url: &url,
        };
        self.tool.execute(&invocation).await
    }

    async fn bulk(&self, operation: &str, command: &MigrationCommand) -> BulkReport {
        let mut report = BulkReport::new(operation);

        for name in self.registry.all_database_names() {
            match self.invoke(&name, command).await {
                Ok(_) => {
                    tracing::info!("{} succeeded for '{}'", operation, name);
                    report.record(name, BulkOutcome::Succeeded);
                }
                Err(e) => {
                    tracing::error!("{} failed for '{}': {}", operation, name, e);
                    report.record(name, BulkOutcome::Failed(e.to_string()));
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for MigrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationOrchestrator")
            .field("schemas_root", &self.schemas_root)
            .finish_non_exhaustive()
    }
}

/// `migrations` directory next to a schema file
pub fn migrations_dir_for(schema_path: &Path) -> PathBuf {
    schema_path
        .parent()
        .map(|dir| dir.join("migrations"))
        .unwrap_or_else(|| PathBuf::from("migrations"))
}

fn ensure_schema(path: &Path) -> HubResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(HubError::configuration(format!("schema file not found: {}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FactoryTable;
    use crate::config::{ConfigResolver, DatabaseConfig, MapEnv};
    use crate::provider::Provider;
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingTool {
        calls: Mutex<Vec<(String, String)>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl MigrationTool for RecordingTool {
        async fn execute(&self, invocation: &MigrationInvocation<'_>) -> HubResult<ToolOutput> {
            self.calls
                .lock()
                .push((invocation.database.to_string(), invocation.command.describe().to_string()));
            if self.failing.iter().any(|name| name == invocation.database) {
                return Err(HubError::Tool {
                    database: invocation.database.to_string(),
                    command: invocation.command.describe().to_string(),
                    message: "exited with exit status: 1".to_string(),
                });
            }
            Ok(ToolOutput {
                stdout: format!("{} ok", invocation.database_url),
                stderr: String::new(),
            })
        }
    }

    struct ScriptedConfirm {
        answer: HubResult<bool>,
        asked: AtomicUsize,
    }

    #[async_trait]
    impl Confirm for ScriptedConfirm {
        async fn confirm(&self, _database: &str) -> HubResult<bool> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(answer) => Ok(*answer),
                Err(e) => Err(HubError::configuration(e.to_string())),
            }
        }
    }

    fn orchestrator(
        root: &TempDir,
        tool: Arc<RecordingTool>,
        names: &[&str],
    ) -> MigrationOrchestrator {
        let registry = ClientRegistry::new(
            Arc::new(FactoryTable::with_defaults()),
            ConfigResolver::new(Arc::new(MapEnv::new())),
        );
        for name in names {
            registry.add_database(DatabaseConfig::with_url(
                *name,
                Provider::PostgreSQL,
                format!("postgresql://localhost/{}", name),
            ));
        }

        let schemas = root.path().join("schemas");
        fs::create_dir_all(&schemas).unwrap();
        fs::write(
            schemas.join("postgresql.prisma"),
            "datasource db {\n  provider = \"postgresql\"\n}\n",
        )
        .unwrap();

        MigrationOrchestrator::new(Arc::new(registry), tool, schemas)
    }

    #[tokio::test]
    async fn test_run_all_continues_past_failure() {
        let root = TempDir::new().unwrap();
        let tool = Arc::new(RecordingTool {
            failing: vec!["b".to_string()],
            ..Default::default()
        });
        let orchestrator = orchestrator(&root, Arc::clone(&tool), &["a", "b", "c"]);

        let report = orchestrator.run_all_migrations(Some("init")).await;
        assert_eq!(report.succeeded(), vec!["a", "c"]);
        assert_eq!(report.failed().len(), 1);
        assert_eq!(report.failed()[0].0, "b");

        let calls: Vec<String> = tool.calls.lock().iter().map(|(db, _)| db.clone()).collect();
        assert_eq!(calls, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_single_database_failure_propagates() {
        let root = TempDir::new().unwrap();
        let tool = Arc::new(RecordingTool {
            failing: vec!["a".to_string()],
            ..Default::default()
        });
        let orchestrator = orchestrator(&root, tool, &["a"]);

        let err = orchestrator.run_migrations("a", None).await.unwrap_err();
        assert!(matches!(err, HubError::Tool { .. }));
        assert!(orchestrator.run_migrations("ghost", None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_reset_requires_confirmation() {
        let root = TempDir::new().unwrap();
        let tool = Arc::new(RecordingTool::default());
        let orchestrator = orchestrator(&root, Arc::clone(&tool), &["orders"]);

        for answer in [Ok(false), Err(HubError::configuration("stdin closed"))] {
            let prompt = Arc::new(ScriptedConfirm {
                answer,
                asked: AtomicUsize::new(0),
            });
            let outcome = orchestrator
                .reset_database("orders", Confirmation::Prompt(prompt.clone()))
                .await
                .unwrap();
            assert_eq!(outcome, ResetOutcome::Cancelled);
            assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
        }
        assert!(tool.calls.lock().is_empty());

        let outcome = orchestrator.reset_database("orders", Confirmation::Forced).await.unwrap();
        assert!(matches!(outcome, ResetOutcome::Completed(_)));
        assert_eq!(
            tool.calls.lock().as_slice(),
            &[("orders".to_string(), "migrate reset".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_schema_is_reported() {
        let root = TempDir::new().unwrap();
        let tool = Arc::new(RecordingTool::default());
        let orchestrator = orchestrator(&root, Arc::clone(&tool), &[]);
        orchestrator.registry.add_database(DatabaseConfig::with_url(
            "legacy",
            Provider::Other("cassandra".to_string()),
            "cassandra://localhost/legacy",
        ));

        let job = orchestrator.job_config("legacy").unwrap();
        assert!(job.schema_path.ends_with("cassandra.prisma"));
        assert_eq!(job.migrations_dir, root.path().join("schemas/migrations"));

        let err = orchestrator.generate_client("legacy").await.unwrap_err();
        assert!(err.to_string().contains("schema file not found"));
        assert!(tool.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_migrations_live_beside_schema() {
        let root = TempDir::new().unwrap();
        let orchestrator = orchestrator(&root, Arc::new(RecordingTool::default()), &["orders"]);

        let job = orchestrator.job_config("orders").unwrap();
        let schemas = root.path().join("schemas");
        assert_eq!(job.schema_path, schemas.join("postgresql.prisma"));
        assert_eq!(job.migrations_dir, schemas.join("migrations"));

        let created = orchestrator.create_migration("orders", "init").unwrap();
        assert!(created.starts_with(schemas.join("migrations")));
        assert!(created.ends_with("migration.sql"));
    }

    #[tokio::test]
    async fn test_configured_job_and_status() {
        let root = TempDir::new().unwrap();
        let tool = Arc::new(RecordingTool::default());
        let orchestrator = orchestrator(&root, tool, &["orders"]);

        let custom_schema = root.path().join("custom.prisma");
        fs::write(&custom_schema, "datasource db {\n  provider = \"postgresql\"\n}\n").unwrap();
        orchestrator.configure(MigrationJobConfig {
            name: "orders".to_string(),
            schema_path: custom_schema.clone(),
            migrations_dir: root.path().join("custom-migrations"),
        });
        assert_eq!(orchestrator.job_config("orders").unwrap().schema_path, custom_schema);

        orchestrator.create_migration("orders", "add users").unwrap();
        let status = orchestrator.get_status("orders").await.unwrap();
        assert_eq!(status.output.stdout, "postgresql://localhost/orders ok");
        assert_eq!(status.local.len(), 1);
        assert_eq!(status.local[0].label, "add_users");
    }

    #[tokio::test]
    async fn test_empty_registry_bulk_is_empty() {
        let root = TempDir::new().unwrap();
        let orchestrator = orchestrator(&root, Arc::new(RecordingTool::default()), &[]);
        let report = orchestrator.seed_all().await;
        assert!(report.is_empty());
        assert_eq!(report.operation, "seed");
    }
}
