//! Per-database outcomes of bulk operations

use serde::Serialize;

/// Outcome of one database within a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum BulkOutcome {
    Succeeded,
    Failed(String),
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BulkOutcome::Succeeded)
    }
}

/// When a bulk operation counts as failed overall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkFailurePolicy {
    /// At least one database failed
    #[default]
    AnyFailure,
    /// Every database failed (an empty batch never fails)
    AllFailed,
}

impl std::str::FromStr for BulkFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(BulkFailurePolicy::AnyFailure),
            "all" => Ok(BulkFailurePolicy::AllFailed),
            other => Err(format!(
                "unknown bulk failure policy '{}', expected 'any' or 'all'",
                other
            )),
        }
    }
}

/// Ordered per-database results of a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub operation: String,
    pub items: Vec<(String, BulkOutcome)>,
}

impl BulkReport {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            items: Vec::new(),
        }
    }

    pub fn record(&mut self, name: impl Into<String>, outcome: BulkOutcome) {
        self.items.push((name.into(), outcome));
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn failed(&self) -> Vec<(&str, &str)> {
        self.items
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                BulkOutcome::Failed(error) => Some((name.as_str(), error.as_str())),
                BulkOutcome::Succeeded => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_failure(&self, policy: BulkFailurePolicy) -> bool {
        let failed = self.failed().len();
        match policy {
            BulkFailurePolicy::AnyFailure => failed > 0,
            BulkFailurePolicy::AllFailed => !self.items.is_empty() && failed == self.items.len(),
        }
    }
}
