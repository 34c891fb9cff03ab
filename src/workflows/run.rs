use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::{OperationResult, OperationStatus};
use crate::telemetry::generate_correlation_id;

/// Ordered record of one workflow invocation.
///
/// Steps are appended as they finish. A step whose status is anything but
/// `Succeeded` (or `Preview` in a dry run) aborts the run; completed steps
/// stay in `steps` and are not rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub workflow: String,
    pub correlation_id: String,
    pub steps: Vec<OperationResult>,
    pub dry_run: bool,
    pub aborted: bool,
    pub aborted_at_step: Option<usize>,
}

impl WorkflowRun {
    pub fn new(workflow: impl Into<String>, dry_run: bool) -> Self {
        Self {
            workflow: workflow.into(),
            correlation_id: generate_correlation_id(),
            steps: Vec::new(),
            dry_run,
            aborted: false,
            aborted_at_step: None,
        }
    }

    /// Append a step result. Returns `false` when the run must stop.
    pub fn record(&mut self, result: OperationResult) -> bool {
        let index = self.steps.len();
        let proceed = match result.status {
            OperationStatus::Succeeded => true,
            OperationStatus::Preview => self.dry_run,
            OperationStatus::Conflicted | OperationStatus::Failed => false,
        };

        if proceed {
            info!(
                workflow = %self.workflow,
                step = index,
                operation = %result.metadata.operation_name,
                "Step finished"
            );
        } else {
            warn!(
                workflow = %self.workflow,
                step = index,
                operation = %result.metadata.operation_name,
                status = ?result.status,
                error_kind = ?result.error_kind,
                "Step did not succeed, aborting workflow"
            );
            self.aborted = true;
            self.aborted_at_step = Some(index);
        }
        self.steps.push(result);
        proceed
    }

    pub(crate) fn log_finished(&self) {
        info!(
            workflow = %self.workflow,
            steps = self.steps.len(),
            aborted = self.aborted,
            aborted_at_step = ?self.aborted_at_step,
            dry_run = self.dry_run,
            "Workflow finished"
        );
    }

    pub fn succeeded(&self) -> bool {
        !self.aborted
    }

    /// Result of the step that stopped the run.
    pub fn failed_step(&self) -> Option<&OperationResult> {
        self.aborted_at_step.and_then(|i| self.steps.get(i))
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            lines.push(format!("[{}] {}", index + 1, step.metadata.operation_name));
            lines.extend(step.render().lines().map(|l| format!("    {l}")));
        }
        match self.aborted_at_step {
            Some(index) => lines.push(format!(
                "{} stopped at step {}; earlier steps were kept",
                self.workflow,
                index + 1
            )),
            None if self.dry_run => lines.push(format!("{} dry run: nothing was executed", self.workflow)),
            None => lines.push(format!("{} completed", self.workflow)),
        }
        lines.join("\n")
    }
}
