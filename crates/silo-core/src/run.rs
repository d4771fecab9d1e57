//! Pipeline run status and stage counters.

use serde::{Deserialize, Serialize};

/// Status of a tracked pipeline run.
///
/// Transitions only `Running -> {Success, Failed, Skipped}`; terminal
/// statuses never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run is currently in progress
    Running,
    /// Run completed successfully
    Success,
    /// Run failed with errors
    Failed,
    /// Run was skipped (e.g. unchanged source)
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
        }
    }

    /// True for every status except `Running`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    /// Parse from the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "success" => Some(RunStatus::Success),
            "failed" => Some(RunStatus::Failed),
            "skipped" => Some(RunStatus::Skipped),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record counters reported when a stage scope closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOutcome {
    /// Records read from the source.
    pub records_input: Option<i64>,
    /// Records that passed through the stage.
    pub records_processed: Option<i64>,
    /// Records written to the warehouse.
    pub records_loaded: Option<i64>,
    /// Records rejected by validation.
    pub records_rejected: Option<i64>,
}

impl StageOutcome {
    /// Outcome with every counter set, for load stages.
    pub fn counts(input: i64, processed: i64, loaded: i64, rejected: i64) -> Self {
        Self {
            records_input: Some(input),
            records_processed: Some(processed),
            records_loaded: Some(loaded),
            records_rejected: Some(rejected),
        }
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
