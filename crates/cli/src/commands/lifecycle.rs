use super::output::{print_report, print_tool_output, CommandStatus};
use super::Selection;
use crate::context::Hub;

pub async fn generate(hub: &Hub, selection: Selection) -> anyhow::Result<CommandStatus> {
    match selection {
        Selection::One(name) => {
            print_tool_output(&hub.orchestrator.generate_client(&name).await?);
            println!("Client generated for '{}'", name);
            Ok(CommandStatus::Success)
        }
        Selection::All => {
            let report = hub.orchestrator.generate_all_clients().await;
            print_report(&report, hub.json)?;
            Ok(CommandStatus::from_report(&report, hub.policy))
        }
    }
}

pub async fn seed(hub: &Hub, selection: Selection) -> anyhow::Result<CommandStatus> {
    match selection {
        Selection::One(name) => {
            print_tool_output(&hub.orchestrator.seed(&name).await?);
            println!("Seeded '{}'", name);
            Ok(CommandStatus::Success)
        }
        Selection::All => {
            let report = hub.orchestrator.seed_all().await;
            print_report(&report, hub.json)?;
            Ok(CommandStatus::from_report(&report, hub.policy))
        }
    }
}

pub async fn push(hub: &Hub, name: &str) -> anyhow::Result<CommandStatus> {
    print_tool_output(&hub.orchestrator.push_schema(name).await?);
    println!("Schema pushed to '{}'", name);
    Ok(CommandStatus::Success)
}

pub async fn studio(hub: &Hub, name: &str) -> anyhow::Result<CommandStatus> {
    hub.orchestrator.open_studio(name).await?;
    Ok(CommandStatus::Success)
}
