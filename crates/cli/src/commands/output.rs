use console::style;
use dbhub::{BulkFailurePolicy, BulkOutcome, BulkReport};
use url::Url;

/// How a command finished when it did not hit a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// A bulk run failed according to the `--fail-on` policy
    BulkFailure,
}

impl CommandStatus {
    pub fn from_report(report: &BulkReport, policy: BulkFailurePolicy) -> Self {
        if report.is_failure(policy) {
            CommandStatus::BulkFailure
        } else {
            CommandStatus::Success
        }
    }

    pub fn code(self) -> u8 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::BulkFailure => 2,
        }
    }
}

pub fn print_report(report: &BulkReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.is_empty() {
        println!("No databases registered, nothing to {}", report.operation);
        return Ok(());
    }

    for (name, outcome) in &report.items {
        match outcome {
            BulkOutcome::Succeeded => println!("  {} {}", style("✓").green(), name),
            BulkOutcome::Failed(error) => println!("  {} {}: {}", style("✗").red(), name, error),
        }
    }
    println!(
        "{}: {} succeeded, {} failed",
        report.operation,
        report.succeeded().len(),
        report.failed().len()
    );
    Ok(())
}

/// Forward captured tool output
pub fn print_tool_output(output: &dbhub::migrations::ToolOutput) {
    if !output.stdout.trim().is_empty() {
        print!("{}", output.stdout);
    }
    if !output.stderr.trim().is_empty() {
        eprint!("{}", output.stderr);
    }
}

/// Hide the password of a connection URL
pub fn mask_database_url(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(mut url) if url.password().is_some() => match url.set_password(Some("****")) {
            Ok(()) => url.to_string(),
            Err(()) => url_str.to_string(),
        },
        Ok(_) => url_str.to_string(),
        // sqlserver style `key=value;` strings
        Err(_) => url_str
            .split(';')
            .map(|part| match part.split_once('=') {
                Some((key, _)) if key.trim().eq_ignore_ascii_case("password") => {
                    format!("{}=****", key)
                }
                _ => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join(";"),
    }
}
