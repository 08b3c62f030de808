use std::path::PathBuf;

use dbhub::migrations::list_migrations;
use serde::Serialize;

use super::output::{mask_database_url, CommandStatus};
use crate::context::Hub;

#[derive(Debug, Serialize)]
struct DatabaseInfo {
    name: String,
    provider: String,
    url: String,
    source: String,
    factory: String,
    schema_path: PathBuf,
    schema_exists: bool,
    migrations_dir: PathBuf,
    migrations: Vec<String>,
}

pub fn run(hub: &Hub, name: &str) -> anyhow::Result<CommandStatus> {
    let (config, url) = hub.registry.connection_target(name)?;
    let job = hub.orchestrator.job_config(name)?;

    let source = match hub.registry.discovered_client(name) {
        Some(client) if client.is_valid => hub
            .registry
            .resolver()
            .resolve(name, &config.provider)
            .map(|target| target.source.to_string())
            .unwrap_or_else(|e| e.to_string()),
        _ => "Declared in configuration".to_string(),
    };

    let info = DatabaseInfo {
        name: name.to_string(),
        provider: config.provider.to_string(),
        url: mask_database_url(&url),
        source,
        factory: config.factory.clone().unwrap_or_else(|| hub.config.default_factory.clone()),
        schema_exists: job.schema_path.is_file(),
        schema_path: job.schema_path,
        migrations: list_migrations(&job.migrations_dir)?
            .into_iter()
            .map(|migration| migration.id)
            .collect(),
        migrations_dir: job.migrations_dir,
    };

    if hub.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(CommandStatus::Success);
    }

    println!("Database:    {}", info.name);
    println!("Provider:    {}", info.provider);
    println!("URL:         {}", info.url);
    println!("Source:      {}", info.source);
    println!("Factory:     {}", info.factory);
    let missing = if info.schema_exists { "" } else { " (missing)" };
    println!("Schema:      {}{}", info.schema_path.display(), missing);
    println!("Migrations:  {} ({})", info.migrations_dir.display(), info.migrations.len());
    for id in &info.migrations {
        println!("  {}", id);
    }
    Ok(CommandStatus::Success)
}
