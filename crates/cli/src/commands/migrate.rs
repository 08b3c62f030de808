use std::sync::Arc;

use dbhub::{Confirmation, ResetOutcome};

use super::output::{print_report, print_tool_output, CommandStatus};
use super::Selection;
use crate::confirm::StdinConfirm;
use crate::context::Hub;

pub fn create(hub: &Hub, name: &str, label: &str) -> anyhow::Result<CommandStatus> {
    let path = hub.orchestrator.create_migration(name, label)?;
    println!("Created migration: {}", path.display());
    Ok(CommandStatus::Success)
}

pub async fn run(
    hub: &Hub,
    selection: Selection,
    label: Option<&str>,
) -> anyhow::Result<CommandStatus> {
    match selection {
        Selection::One(name) => {
            let output = hub.orchestrator.run_migrations(&name, label).await?;
            print_tool_output(&output);
            println!("Migrations applied to '{}'", name);
            Ok(CommandStatus::Success)
        }
        Selection::All => {
            let report = hub.orchestrator.run_all_migrations(label).await;
            print_report(&report, hub.json)?;
            Ok(CommandStatus::from_report(&report, hub.policy))
        }
    }
}

pub async fn status(hub: &Hub, name: &str) -> anyhow::Result<CommandStatus> {
    let status = hub.orchestrator.get_status(name).await?;
    print_tool_output(&status.output);

    if status.local.is_empty() {
        println!("No local migrations for '{}'", name);
    } else {
        println!("Local migrations for '{}':", name);
        for migration in &status.local {
            println!("  {}", migration.id);
        }
    }
    Ok(CommandStatus::Success)
}

pub async fn reset(hub: &Hub, name: &str, force: bool) -> anyhow::Result<CommandStatus> {
    let confirmation = if force {
        Confirmation::Forced
    } else {
        Confirmation::Prompt(Arc::new(StdinConfirm))
    };

    match hub.orchestrator.reset_database(name, confirmation).await? {
        ResetOutcome::Completed(output) => {
            print_tool_output(&output);
            println!("Database '{}' reset", name);
        }
        ResetOutcome::Cancelled => println!("Reset of '{}' cancelled", name),
    }
    Ok(CommandStatus::Success)
}
