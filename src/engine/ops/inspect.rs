use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::{optional_ref, EngineError, GitEngine, OperationResult, ResultBuilder};
use crate::external::GitCommand;

pub const DEFAULT_LOG_COUNT: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct StatusOptions {
    /// Short format with a branch summary line
    #[arg(short, long)]
    pub short: bool,
}

impl StatusOptions {
    pub fn command(&self) -> GitCommand {
        if self.short {
            GitCommand::new(["status", "--short", "--branch"])
        } else {
            GitCommand::new(["status"])
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct LogOptions {
    /// Maximum number of commits to show
    #[arg(short = 'n', long)]
    pub max_count: Option<u32>,
    /// One line per commit
    #[arg(long)]
    pub oneline: bool,
    /// Only commits by this author
    #[arg(long)]
    pub author: Option<String>,
    /// Revision or range to list
    pub reference: Option<String>,
    /// Only commits touching this path
    #[arg(long)]
    pub path: Option<String>,
}

impl LogOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let reference = optional_ref("log", "reference", self.reference.as_deref())?;
        let count = self.max_count.unwrap_or(DEFAULT_LOG_COUNT).max(1);
        let paths: Vec<String> = self.path.iter().cloned().collect();

        Ok(GitCommand::new(["log", "-n"])
            .arg(count.to_string())
            .arg_if(self.oneline, "--oneline")
            .maybe_arg(self.author.as_ref().map(|a| format!("--author={a}")))
            .maybe_arg(reference)
            .pathspecs(&paths))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct DiffOptions {
    /// Compare the index instead of the work tree
    #[arg(long)]
    pub staged: bool,
    /// Only show a diffstat
    #[arg(long)]
    pub stat: bool,
    /// Commit or branch to diff against
    #[arg(long)]
    pub reference: Option<String>,
    /// Limit the diff to these paths
    pub paths: Vec<String>,
}

impl DiffOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let reference = optional_ref("diff", "reference", self.reference.as_deref())?;
        Ok(GitCommand::new(["diff"])
            .arg_if(self.staged, "--cached")
            .arg_if(self.stat, "--stat")
            .maybe_arg(reference)
            .pathspecs(&self.paths))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct BlameOptions {
    /// File to annotate
    pub file: String,
    #[arg(long)]
    pub start_line: Option<u32>,
    #[arg(long)]
    pub end_line: Option<u32>,
    /// Annotate as of this revision
    #[arg(long)]
    pub reference: Option<String>,
}

impl BlameOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let file = self.file.trim();
        if file.is_empty() {
            return Err(EngineError::missing("blame", "file"));
        }
        let reference = optional_ref("blame", "reference", self.reference.as_deref())?;

        let range = match (self.start_line, self.end_line) {
            (Some(0), _) | (_, Some(0)) => {
                return Err(EngineError::invalid("blame", "start_line", "line numbers start at 1"))
            }
            (Some(start), Some(end)) if start > end => {
                return Err(EngineError::invalid(
                    "blame",
                    "end_line",
                    "must not be before start_line",
                ))
            }
            (Some(start), Some(end)) => Some(format!("{start},{end}")),
            (Some(start), None) => Some(format!("{start},")),
            (None, Some(end)) => Some(format!(",{end}")),
            (None, None) => None,
        };

        Ok(GitCommand::new(["blame"])
            .maybe_arg(range.map(|r| format!("-L{r}")))
            .maybe_arg(reference)
            .pathspecs(&[file.to_string()]))
    }
}

impl GitEngine {
    pub async fn status(&self, dir: &Path, options: &StatusOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("status", dir);
        guarded!(self, builder);
        Ok(self.run(&builder, options.command(), None).await)
    }

    pub async fn log(&self, dir: &Path, options: &LogOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("log", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, None).await)
    }

    pub async fn diff(&self, dir: &Path, options: &DiffOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("diff", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, None).await)
    }

    pub async fn blame(&self, dir: &Path, options: &BlameOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("blame", dir);
        guarded!(self, builder);
        let command = options.command()?;
        Ok(self.run(&builder, command, None).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::external::ScriptedExecutor;
    use std::sync::Arc;

    #[test]
    fn test_log_command_defaults() {
        let command = LogOptions::default().command().unwrap();
        assert_eq!(command.render(), "git log -n 20");

        let filtered = LogOptions {
            max_count: Some(3),
            oneline: true,
            author: Some("Ada".to_string()),
            reference: Some("main..feature".to_string()),
            path: Some("src".to_string()),
        };
        assert_eq!(
            filtered.command().unwrap().render(),
            "git log -n 3 --oneline --author=Ada main..feature -- src"
        );
    }

    #[test]
    fn test_blame_line_range() {
        let options = BlameOptions {
            file: "src/lib.rs".to_string(),
            start_line: Some(10),
            end_line: Some(20),
            reference: None,
        };
        assert_eq!(options.command().unwrap().render(), "git blame -L10,20 -- src/lib.rs");

        let reversed = BlameOptions {
            start_line: Some(20),
            end_line: Some(10),
            ..options
        };
        assert!(matches!(reversed.command(), Err(EngineError::InvalidArgument { .. })));
        assert!(matches!(
            BlameOptions::default().command(),
            Err(EngineError::MissingArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_status_reports_output_lines() {
        let executor = Arc::new(
            ScriptedExecutor::new().ok("git status --short --branch", "## main\n M src/lib.rs\n"),
        );
        let engine = engine_with(executor);
        let result = engine
            .status(dir(), &StatusOptions { short: true })
            .await
            .unwrap();

        assert!(result.succeeded());
        assert_eq!(result.message, vec!["## main".to_string(), " M src/lib.rs".to_string()]);
    }
}
