//! Migration lifecycle: tool invocation, migration files and orchestration

pub mod bulk;
pub mod manager;
pub mod orchestrator;
pub mod tool;

pub use bulk::{BulkFailurePolicy, BulkOutcome, BulkReport};
pub use manager::{create_migration, list_migrations, MigrationFile};
pub use orchestrator::{
    Confirm, Confirmation, MigrationJobConfig, MigrationOrchestrator, MigrationStatus, ResetOutcome,
};
pub use tool::{
    CommandMigrationTool, MigrationCommand, MigrationInvocation, MigrationTool, ToolOutput,
};
