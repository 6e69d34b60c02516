//! Build result types.
//!
//! Contains types for representing the outcome of pipeline runs.

use crate::build::Stage;
use std::path::PathBuf;
use std::time::Duration;

/// Status of a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// Stage succeeded
    Success,
    /// Stage failed with error
    Failed(String),
}

impl StageStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Success)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Success => write!(f, "success"),
            StageStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running a single stage.
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Stage that ran
    pub stage: Stage,
    /// Outcome
    pub status: StageStatus,
    /// Files written by the stage
    pub outputs: Vec<PathBuf>,
    /// Stage duration
    pub duration: Duration,
    /// Exit code of the external tool that failed the stage, if any
    pub exit_code: Option<i32>,
}

impl StageResult {
    /// Create a successful result.
    pub fn success(stage: Stage, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { stage, status: StageStatus::Success, outputs, duration, exit_code: None }
    }

    /// Create a failed result.
    pub fn failed(stage: Stage, error: String, duration: Duration) -> Self {
        Self { stage, status: StageStatus::Failed(error), outputs: vec![], duration, exit_code: None }
    }

    /// Attach the exit code of a failing tool.
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each stage, in execution order
    pub stages: Vec<StageResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage result.
    pub fn add_result(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    pub fn success_count(&self) -> usize {
        self.stages.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall build succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// First failed stage, which aborted the run.
    pub fn first_failure(&self) -> Option<&StageResult> {
        self.stages.iter().find(|r| r.status.is_failure())
    }

    /// Stages that ran, in execution order.
    pub fn executed(&self) -> Vec<Stage> {
        self.stages.iter().map(|r| r.stage).collect()
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.stages.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Process exit code for this run.
    ///
    /// Zero on success; otherwise the failing tool's exit code when it fits
    /// a process status, else 1.
    pub fn exit_code(&self) -> u8 {
        match self.first_failure() {
            None => 0,
            Some(failure) => match failure.exit_code {
                Some(code) if (1..=255).contains(&code) => code as u8,
                _ => 1,
            },
        }
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let success = self.success_count();
        let failed = self.failed_count();
        let total = self.stages.len();

        let mut lines = Vec::new();
        if let Some(failure) = self.first_failure() {
            lines.push(format!(
                "Build failed: {} succeeded, {} failed ({} total)",
                success, failed, total
            ));
            lines.push(format!("  - {}: {}", failure.stage, failure.status));
        } else {
            lines.push(format!(
                "Build succeeded: {} stage{} in {:?}",
                success,
                if success == 1 { "" } else { "s" },
                self.total_duration
            ));
        }

        lines.join("\n")
    }
}
