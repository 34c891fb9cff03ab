//! Base command execution abstraction
//!
//! Every call into the version-control tool goes through [`CommandExecutor`].
//! Commands are built as argument vectors ([`GitCommand`]) and are only joined
//! into a quoted string for display, so the program allow-list below is the
//! single place where what gets spawned is decided.

use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::observability::executor_metrics;

/// Program name every command must start with unless configured otherwise.
pub const DEFAULT_PROGRAM: &str = "git";

/// A version-control command as an explicit argument list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitCommand {
    program: String,
    args: Vec<String>,
}

impl GitCommand {
    /// `git` followed by `args`.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_program(DEFAULT_PROGRAM, args)
    }

    pub fn with_program<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_if(self, condition: bool, arg: impl Into<String>) -> Self {
        if condition {
            self.arg(arg)
        } else {
            self
        }
    }

    pub fn maybe_arg<S: Into<String>>(self, arg: Option<S>) -> Self {
        match arg {
            Some(arg) => self.arg(arg),
            None => self,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `--` followed by `paths`, skipped entirely when `paths` is empty.
    pub fn pathspecs(self, paths: &[String]) -> Self {
        if paths.is_empty() {
            return self;
        }
        self.arg("--").args(paths.iter().cloned())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The command joined with POSIX shell quoting, as a user would type it.
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Quote a single argument for display in a POSIX shell.
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    let safe = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | '@' | '%' | '+' | ',' | '^' | '~')
        });
    if safe {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    /// stderr then stdout; git reports some failures (merge conflicts) on stdout.
    pub fn diagnostic_text(&self) -> String {
        match (self.stderr.trim(), self.stdout.trim()) {
            ("", out) => out.to_string(),
            (err, "") => err.to_string(),
            (err, out) => format!("{err}\n{out}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Refusing to run '{found}': only '{expected}' commands are allowed")]
    InvalidProgram { expected: String, found: String },
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("IO error: {message}")]
    Io { message: String },
}

/// Trait for executing version-control commands
///
/// The rest of the crate never touches `tokio::process` directly, so tests can
/// substitute a mock and count exactly which commands were issued.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` in `working_dir`, killing it once `timeout` elapses.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// [`CommandOutput::status_code`].
    async fn execute(
        &self,
        command: &GitCommand,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// Real implementation using `tokio::process::Command`
#[derive(Debug, Clone)]
pub struct ProcessCommandExecutor {
    program: String,
}

impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ProcessCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        command: &GitCommand,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        if command.program() != self.program {
            warn!(
                expected = %self.program,
                found = %command.program(),
                "Rejected command with unexpected program"
            );
            return Err(CommandError::InvalidProgram {
                expected: self.program.clone(),
                found: command.program().to_string(),
            });
        }

        let metrics = executor_metrics();
        metrics.record_spawn();
        debug!(command = %command, cwd = %working_dir.display(), timeout_ms = timeout.as_millis() as u64, "Spawning command");

        // Dropping the output future on timeout kills the child via kill_on_drop.
        let pending = tokio::process::Command::new(command.program())
            .args(command.arguments())
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_EDITOR", "true")
            .env("LC_ALL", "C")
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, pending).await {
            Err(_) => {
                metrics.record_timeout();
                warn!(command = %command, timeout_ms = timeout.as_millis() as u64, "Command timed out and was killed");
                return Err(CommandError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(Err(e)) => {
                metrics.record_failure();
                return Err(if e.kind() == std::io::ErrorKind::NotFound {
                    CommandError::CommandNotFound {
                        command: command.program().to_string(),
                    }
                } else {
                    CommandError::Io { message: e.to_string() }
                });
            }
            Ok(Ok(output)) => output,
        };

        let result = CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        if !result.success() {
            metrics.record_failure();
        }
        debug!(command = %command, exit_code = result.status_code, "Command finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_quotes_only_when_needed() {
        let command = GitCommand::new(["commit", "-m", "fix: it's done"]);
        assert_eq!(command.render(), r"git commit -m 'fix: it'\''s done'");

        let plain = GitCommand::new(["log", "-n", "5", "--oneline"]);
        assert_eq!(plain.to_string(), "git log -n 5 --oneline");

        assert_eq!(quote_arg(""), "''");
        assert_eq!(quote_arg("a;rm -rf /"), "'a;rm -rf /'");
    }

    #[test]
    fn test_builder_helpers() {
        let command = GitCommand::new(["push"])
            .arg_if(true, "--set-upstream")
            .arg_if(false, "--tags")
            .maybe_arg(Some("origin"))
            .maybe_arg(None::<String>)
            .pathspecs(&[]);
        assert_eq!(command.arguments(), ["push", "--set-upstream", "origin"]);

        let with_paths = GitCommand::new(["add"]).pathspecs(&["a.txt".to_string()]);
        assert_eq!(with_paths.arguments(), ["add", "--", "a.txt"]);
    }

    #[test]
    fn test_diagnostic_text_merges_streams() {
        let output = CommandOutput {
            status_code: 1,
            stdout: "CONFLICT (content): Merge conflict in a.txt\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.diagnostic_text(), "CONFLICT (content): Merge conflict in a.txt");

        let both = CommandOutput {
            status_code: 1,
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
        };
        assert_eq!(both.diagnostic_text(), "err\nout");
    }

    #[tokio::test]
    async fn test_process_command_executor_success() {
        let executor = ProcessCommandExecutor::new();
        let result = executor
            .execute(
                &GitCommand::new(["--version"]),
                &std::env::temp_dir(),
                Duration::from_secs(10),
            )
            .await;

        let output = result.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("git version"));
    }

    #[tokio::test]
    async fn test_rejects_other_programs() {
        let executor = ProcessCommandExecutor::new();
        let result = executor
            .execute(
                &GitCommand::with_program("sh", ["-c", "echo pwned"]),
                &std::env::temp_dir(),
                Duration::from_secs(10),
            )
            .await;

        assert!(matches!(result, Err(CommandError::InvalidProgram { .. })));
    }

    #[tokio::test]
    async fn test_process_command_executor_command_not_found() {
        let executor = ProcessCommandExecutor::with_program("nonexistent_command_xyz");
        let result = executor
            .execute(
                &GitCommand::with_program("nonexistent_command_xyz", Vec::<String>::new()),
                &std::env::temp_dir(),
                Duration::from_secs(10),
            )
            .await;

        assert!(matches!(result.unwrap_err(), CommandError::CommandNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let executor = ProcessCommandExecutor::with_program("sleep");
        let started = std::time::Instant::now();
        let result = executor
            .execute(
                &GitCommand::with_program("sleep", ["5"]),
                &std::env::temp_dir(),
                Duration::from_millis(100),
            )
            .await;

        assert_eq!(result.unwrap_err(), CommandError::Timeout { timeout_ms: 100 });
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    /// POSIX shell reading of one quoted word.
    fn shell_unquote(word: &str) -> String {
        let mut out = String::new();
        let mut quoted = false;
        let mut chars = word.chars();
        while let Some(c) = chars.next() {
            match c {
                '\'' => quoted = !quoted,
                '\\' if !quoted => out.extend(chars.next()),
                c => out.push(c),
            }
        }
        out
    }

    proptest::proptest! {
        #[test]
        fn quote_arg_round_trips_through_the_shell(arg in ".*") {
            let quoted = quote_arg(&arg);
            proptest::prop_assert_eq!(shell_unquote(&quoted), arg);
        }
    }
}
