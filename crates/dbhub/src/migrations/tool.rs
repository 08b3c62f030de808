//! External migration tool invocation

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::HubConfig;
use crate::error::{HubError, HubResult};

/// Lifecycle operation understood by the migration tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationCommand {
    /// Apply pending migrations, optionally creating one named `label`
    Dev { label: Option<String> },
    Status,
    Reset,
    Push,
    Generate,
    Studio,
    Seed,
}

impl MigrationCommand {
    /// Tool arguments, excluding the schema flag
    pub fn args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            MigrationCommand::Dev { .. } => &["migrate", "dev"],
            MigrationCommand::Status => &["migrate", "status"],
            // Confirmation already happened on our side.
            MigrationCommand::Reset => &["migrate", "reset", "--force"],
            MigrationCommand::Push => &["db", "push"],
            MigrationCommand::Generate => &["generate"],
            MigrationCommand::Studio => &["studio"],
            MigrationCommand::Seed => &["db", "seed"],
        };
        let mut args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        if let MigrationCommand::Dev { label: Some(label) } = self {
            args.push("--name".to_string());
            args.push(label.clone());
        }
        args
    }

    /// Whether the tool needs the terminal (stdio is inherited)
    pub fn is_interactive(&self) -> bool {
        matches!(self, MigrationCommand::Studio)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            MigrationCommand::Dev { .. } => "migrate dev",
            MigrationCommand::Status => "migrate status",
            MigrationCommand::Reset => "migrate reset",
            MigrationCommand::Push => "db push",
            MigrationCommand::Generate => "generate",
            MigrationCommand::Studio => "studio",
            MigrationCommand::Seed => "db seed",
        }
    }
}

/// Everything the tool needs for one invocation
#[derive(Debug, Clone)]
pub struct MigrationInvocation<'a> {
    pub database: &'a str,
    pub command: &'a MigrationCommand,
    pub schema_path: &'a Path,
    pub database_url: &'a str,
}

/// Captured tool output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes migration lifecycle operations
#[async_trait]
pub trait MigrationTool: Send + Sync {
    async fn execute(&self, invocation: &MigrationInvocation<'_>) -> HubResult<ToolOutput>;
}

/// Runs an external migration CLI as a child process
///
/// The resolved connection URL is passed as `DATABASE_URL` and the schema as
/// `--schema <path>`. The tool reads migrations from the `migrations`
/// directory beside the schema.
#[derive(Debug, Clone)]
pub struct CommandMigrationTool {
    program: String,
    base_args: Vec<String>,
}

impl CommandMigrationTool {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    pub fn from_config(config: &HubConfig) -> Self {
        let (program, base_args) = config.migration_command();
        Self::new(program, base_args)
    }

    fn build(&self, invocation: &MigrationInvocation<'_>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .args(invocation.command.args())
            .arg("--schema")
            .arg(invocation.schema_path)
            .env("DATABASE_URL", invocation.database_url)
            .kill_on_drop(true);
        command
    }

    fn failure(
        &self,
        invocation: &MigrationInvocation<'_>,
        message: impl Into<String>,
    ) -> HubError {
        HubError::Tool {
            database: invocation.database.to_string(),
            command: invocation.command.describe().to_string(),
            message: message.into(),
        }
    }

    fn launch_failure(&self, invocation: &MigrationInvocation<'_>, e: std::io::Error) -> HubError {
        self.failure(invocation, format!("failed to launch {}: {}", self.program, e))
    }
}

#[async_trait]
impl MigrationTool for CommandMigrationTool {
    async fn execute(&self, invocation: &MigrationInvocation<'_>) -> HubResult<ToolOutput> {
        let mut command = self.build(invocation);
        tracing::info!(
            "Running {} {} for '{}'",
            self.program,
            invocation.command.describe(),
            invocation.database
        );

        if invocation.command.is_interactive() {
            let status = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(|e| self.launch_failure(invocation, e))?;
            return if status.success() {
                Ok(ToolOutput::default())
            } else {
                Err(self.failure(invocation, format!("exited with {}", status)))
            };
        }

        let output = command
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.launch_failure(invocation, e))?;

        let captured = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            Ok(captured)
        } else {
            let detail = captured.stderr.trim();
            let message = if detail.is_empty() {
                format!("exited with {}", output.status)
            } else {
                format!("exited with {}: {}", output.status, detail)
            };
            Err(self.failure(invocation, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args() {
        assert_eq!(
            MigrationCommand::Dev { label: Some("add_users".into()) }.args(),
            vec!["migrate", "dev", "--name", "add_users"]
        );
        assert_eq!(MigrationCommand::Dev { label: None }.args(), vec!["migrate", "dev"]);
        assert_eq!(MigrationCommand::Reset.args(), vec!["migrate", "reset", "--force"]);
        assert_eq!(MigrationCommand::Push.args(), vec!["db", "push"]);
        assert!(MigrationCommand::Studio.is_interactive());
        assert!(!MigrationCommand::Status.is_interactive());
    }

    #[test]
    fn test_from_config_splits_program() {
        let config = HubConfig {
            migration_tool: "pnpm exec prisma".to_string(),
            ..HubConfig::default()
        };
        let tool = CommandMigrationTool::from_config(&config);
        assert_eq!(tool.program, "pnpm");
        assert_eq!(tool.base_args, vec!["exec", "prisma"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_failure_and_success() {
        let invocation = MigrationInvocation {
            database: "orders",
            command: &MigrationCommand::Status,
            schema_path: Path::new("schemas/postgresql.prisma"),
            database_url: "postgresql://localhost/orders",
        };

        let ok = CommandMigrationTool::new(
            "sh",
            vec!["-c".into(), "echo \"$DATABASE_URL $0 $1 $2\"".into()],
        );
        let output = ok.execute(&invocation).await.unwrap();
        assert_eq!(output.stdout.trim(), "postgresql://localhost/orders migrate status --schema");

        let failing =
            CommandMigrationTool::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()]);
        let err = failing.execute(&invocation).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("migrate status"), "{}", message);
        assert!(message.contains("boom"), "{}", message);

        let missing = CommandMigrationTool::new("dbhub-definitely-missing-binary", Vec::new());
        assert!(missing.execute(&invocation).await.is_err());
    }
}
