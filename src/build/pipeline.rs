//! Build pipeline orchestration.
//!
//! The pipeline runs the stages of a [`StagePlan`] in order, stopping at the
//! first failure so that no stage ever runs after one of its prerequisites
//! failed.

use crate::build::{
    BuildContext, BuildResult, NullProgress, ProgressEvent, ProgressReporter, Stage, StageKind,
    StagePlan, StageResult,
};
use crate::tasks;
use std::sync::Arc;
use std::time::Instant;

/// Build pipeline for executing stages.
pub struct Pipeline {
    /// Build context
    context: BuildContext,
    /// Where progress events go
    reporter: Arc<dyn ProgressReporter>,
}

impl Pipeline {
    /// Create a new pipeline that reports nothing.
    pub fn new(context: BuildContext) -> Self {
        Self { context, reporter: Arc::new(NullProgress::new()) }
    }

    /// Set the progress reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Send an event to the progress reporter.
    pub fn report(&self, event: ProgressEvent) {
        self.reporter.report(event);
    }

    /// Run a stage together with everything it depends on.
    pub fn run(&self, stage: Stage) -> BuildResult {
        self.run_plan(&StagePlan::for_stage(stage))
    }

    /// Run a pre-computed plan.
    pub fn run_plan(&self, plan: &StagePlan) -> BuildResult {
        let start = Instant::now();
        let stages: Vec<Stage> = plan.executable().collect();

        if self.context.is_verbose() {
            let names: Vec<&str> = plan.stages().iter().map(|s| s.name()).collect();
            log::info!("plan: {}", names.join(" -> "));
        }
        self.reporter.report(ProgressEvent::BuildStarted { total_stages: stages.len() });

        let mut result = BuildResult::new();
        for stage in stages {
            let stage_result = self.execute_stage(stage);
            let failed = !stage_result.is_success();
            result.add_result(stage_result);
            if failed {
                break;
            }
        }

        let result = result.with_duration(start.elapsed());
        self.reporter.report(ProgressEvent::BuildCompleted {
            success: result.is_success(),
            duration_ms: result.total_duration.as_millis() as u64,
            succeeded: result.success_count(),
            failed: result.failed_count(),
        });
        result
    }

    /// Execute a single stage.
    fn execute_stage(&self, stage: Stage) -> StageResult {
        let start = Instant::now();
        self.reporter.report(ProgressEvent::StageStarted { stage });
        log::debug!("starting {}", stage);

        let stage_result = match tasks::run_stage(stage, &self.context) {
            Ok(outputs) => {
                if outputs.is_empty() && stage.kind() == StageKind::Transform {
                    self.reporter.report(ProgressEvent::Warning {
                        stage: Some(stage),
                        message: "no files written".to_string(),
                    });
                }
                StageResult::success(stage, outputs, start.elapsed())
            }
            Err(e) => {
                log::debug!("{} failed: {:?}", stage, e);
                StageResult::failed(stage, e.to_string(), start.elapsed())
                    .with_exit_code(e.exit_code())
            }
        };

        self.reporter.report(ProgressEvent::StageCompleted {
            stage,
            status: stage_result.status.clone(),
            duration_ms: stage_result.duration.as_millis() as u64,
        });
        stage_result
    }
}
