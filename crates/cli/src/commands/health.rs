use std::collections::BTreeMap;

use console::style;
use dbhub::{BulkOutcome, BulkReport, HealthStatus};
use serde_json::json;

use super::output::CommandStatus;
use crate::context::Hub;

/// Probe every database; unhealthy ones count as failures under `--fail-on`
pub async fn run(hub: &Hub) -> anyhow::Result<CommandStatus> {
    let statuses = hub.health.check_detailed().await;

    let mut report = BulkReport::new("health");
    for (name, status) in &statuses {
        let outcome = match status {
            HealthStatus::Healthy { .. } => BulkOutcome::Succeeded,
            HealthStatus::Unhealthy { reason } => BulkOutcome::Failed(reason.clone()),
        };
        report.record(name.clone(), outcome);
    }

    if hub.json {
        let body: BTreeMap<&str, serde_json::Value> = statuses
            .iter()
            .map(|(name, status)| {
                let value = match status {
                    HealthStatus::Healthy { latency } => {
                        json!({ "healthy": true, "latency_ms": latency.as_millis() as u64 })
                    }
                    HealthStatus::Unhealthy { reason } => {
                        json!({ "healthy": false, "error": reason })
                    }
                };
                (name.as_str(), value)
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else if statuses.is_empty() {
        println!("No databases registered");
    } else {
        for (name, status) in &statuses {
            let mark = if status.is_healthy() {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!("  {} {}: {}", mark, name, status);
        }
    }

    Ok(CommandStatus::from_report(&report, hub.policy))
}
