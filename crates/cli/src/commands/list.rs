use console::style;
use serde::Serialize;

use super::output::CommandStatus;
use crate::context::Hub;

#[derive(Debug, Serialize)]
struct DatabaseRow {
    name: String,
    provider: String,
    origin: &'static str,
    default: bool,
}

pub fn run(hub: &Hub) -> anyhow::Result<CommandStatus> {
    let default = hub.registry.default_database();
    let rows: Vec<DatabaseRow> = hub
        .registry
        .all_database_names()
        .into_iter()
        .map(|name| {
            let provider = hub
                .registry
                .provider_of(&name)
                .map(|provider| provider.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            let origin = match hub.registry.discovered_client(&name) {
                Some(client) if client.is_valid => "discovered",
                _ => "declared",
            };
            DatabaseRow {
                default: default.as_deref() == Some(name.as_str()),
                name,
                provider,
                origin,
            }
        })
        .collect();

    if hub.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(CommandStatus::Success);
    }

    if rows.is_empty() {
        println!("No databases registered");
        return Ok(CommandStatus::Success);
    }

    let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0);
    let header = format!("{:width$}  {:12}  {}", "NAME", "PROVIDER", "ORIGIN", width = width);
    println!("{}", style(header).bold());
    for row in &rows {
        let marker = if row.default { " (default)" } else { "" };
        println!(
            "{:width$}  {:12}  {}{}",
            row.name,
            row.provider,
            row.origin,
            style(marker).dim(),
            width = width
        );
    }
    Ok(CommandStatus::Success)
}
