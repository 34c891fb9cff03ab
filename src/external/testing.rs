//! Scripted executor for tests
//!
//! Responses are keyed by the rendered command line (`git diff --cached --quiet`).
//! Each key holds a queue; the last queued response repeats once the others
//! are consumed. Every call is recorded so tests can assert on ordering.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::command::{CommandError, CommandExecutor, CommandOutput, GitCommand};

#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, VecDeque<Result<CommandOutput, CommandError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(self, command: &str, response: Result<CommandOutput, CommandError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Exit status 0 with the given stdout.
    pub fn ok(self, command: &str, stdout: &str) -> Self {
        self.expect(
            command,
            Ok(CommandOutput {
                status_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        )
    }

    /// Non-zero exit status with the given stderr.
    pub fn fail(self, command: &str, status_code: i32, stderr: &str) -> Self {
        self.expect(
            command,
            Ok(CommandOutput {
                status_code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
        )
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn was_called(&self, command: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == command)
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        command: &GitCommand,
        _working_dir: &Path,
        _timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let key = command.render();
        self.calls.lock().unwrap().push(key.clone());

        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue.front().cloned().unwrap(),
            _ => Err(CommandError::CommandNotFound { command: key }),
        }
    }
}
