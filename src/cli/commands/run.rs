use anyhow::Result;
use std::process::ExitCode;

use crate::engine::{GitEngine, OperationStatus};
use crate::observability::executor_metrics;
use crate::request::{DispatchOutcome, OperationRequest};

/// Exit status for a finished operation: 0 on success or preview, 1 on
/// failure, 2 when paused on conflicts.
pub fn exit_code(outcome: &DispatchOutcome) -> u8 {
    match outcome.status() {
        OperationStatus::Conflicted => 2,
        OperationStatus::Failed => 1,
        _ if outcome.is_error() => 1,
        _ => 0,
    }
}

pub struct RunCommand {
    engine: GitEngine,
    request: OperationRequest,
    json: bool,
}

impl RunCommand {
    pub fn new(engine: GitEngine, request: OperationRequest) -> Self {
        Self {
            engine,
            request,
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub async fn execute(&self) -> Result<ExitCode> {
        let outcome = self.engine.dispatch(&self.request).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            let text = outcome.render();
            if outcome.is_error() {
                eprintln!("{text}");
            } else if !text.is_empty() {
                println!("{text}");
            }
        }

        executor_metrics().log_stats();
        Ok(ExitCode::from(exit_code(&outcome)))
    }
}
