use anyhow::Context;
use console::style;

use super::output::CommandStatus;
use crate::context::Hub;

/// Show the discovery snapshot, registering usable clients when asked
pub async fn run(hub: &Hub, register: bool) -> anyhow::Result<CommandStatus> {
    let (snapshot, registered) = if register {
        let registered = hub.register_discovered().await?;
        (hub.registry.discovered(), Some(registered))
    } else {
        let snapshot = hub.discovery.scan().await.context("client discovery failed")?;
        (snapshot, None)
    };

    if hub.json {
        let clients: Vec<_> = snapshot.values().collect();
        let body = serde_json::json!({ "clients": clients, "registered": registered });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(CommandStatus::Success);
    }

    println!(
        "Scanned {}: {} client(s)",
        hub.discovery.clients_root().display(),
        snapshot.len()
    );
    for client in snapshot.values() {
        if client.is_valid {
            let provider = client
                .provider
                .as_ref()
                .map(|provider| provider.to_string())
                .unwrap_or_else(|| "postgresql (assumed)".to_string());
            let schema = client
                .schema_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {} {:16} {:24} {}", style("✓").green(), client.name, provider, schema);
        } else {
            println!(
                "  {} {:16} {}",
                style("✗").red(),
                client.name,
                client.error.as_deref().unwrap_or("invalid")
            );
        }
    }

    if let Some(registered) = registered {
        println!("Registered {} client(s): {}", registered.len(), registered.join(", "));
    }
    Ok(CommandStatus::Success)
}
