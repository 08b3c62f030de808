use async_trait::async_trait;
use console::style;
use dbhub::{Confirm, HubResult};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Asks the operator to type the database name before a reset
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, database: &str) -> HubResult<bool> {
        eprintln!(
            "{} Resetting '{}' drops all of its data and reapplies every migration.",
            style("WARNING:").yellow().bold(),
            database
        );
        eprint!("   Type the database name to continue: ");
        tokio::io::stderr().flush().await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let response = lines.next_line().await?.unwrap_or_default();

        Ok(response_matches(&response, database))
    }
}

fn response_matches(response: &str, database: &str) -> bool {
    response.trim() == database
}
