use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::{optional_ref, require_ref, EngineError, ErrorKind, GitEngine, OperationResult, ResultBuilder};
use crate::external::GitCommand;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BranchAction {
    #[default]
    List,
    Create,
    Delete,
    Rename,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct BranchOptions {
    #[arg(value_enum, default_value_t)]
    pub action: BranchAction,
    /// Branch to create, delete or rename
    pub name: Option<String>,
    /// New name when renaming
    pub new_name: Option<String>,
    /// Where a new branch starts (HEAD when omitted)
    #[arg(long)]
    pub start_point: Option<String>,
    /// Delete even if not merged
    #[arg(short, long)]
    pub force: bool,
    /// Include remote-tracking branches when listing
    #[arg(short, long)]
    pub all: bool,
}

impl BranchOptions {
    pub fn create(name: impl Into<String>) -> Self {
        Self {
            action: BranchAction::Create,
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn delete(name: impl Into<String>, force: bool) -> Self {
        Self {
            action: BranchAction::Delete,
            name: Some(name.into()),
            force,
            ..Self::default()
        }
    }

    fn name(&self) -> Result<String, EngineError> {
        require_ref("branch", "name", self.name.as_deref().unwrap_or_default())
    }

    pub fn command(&self) -> Result<GitCommand, EngineError> {
        Ok(match self.action {
            BranchAction::List => GitCommand::new(["branch", "--list", "-vv"]).arg_if(self.all, "--all"),
            BranchAction::Create => GitCommand::new(["branch"])
                .arg(self.name()?)
                .maybe_arg(optional_ref("branch", "start_point", self.start_point.as_deref())?),
            BranchAction::Delete => {
                GitCommand::new(["branch", if self.force { "-D" } else { "-d" }]).arg(self.name()?)
            }
            BranchAction::Rename => GitCommand::new(["branch", "-m"]).arg(self.name()?).arg(require_ref(
                "branch",
                "new_name",
                self.new_name.as_deref().unwrap_or_default(),
            )?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct CheckoutOptions {
    /// Branch, tag or commit to switch to
    pub target: String,
    /// Create the branch first; it must not exist yet
    #[arg(short = 'b', long)]
    pub create: bool,
    /// Start point for a created branch
    #[arg(long)]
    pub start_point: Option<String>,
}

impl CheckoutOptions {
    pub fn command(&self) -> Result<GitCommand, EngineError> {
        let target = require_ref("checkout", "target", &self.target)?;
        if self.create {
            Ok(GitCommand::new(["checkout", "-b"])
                .arg(target)
                .maybe_arg(optional_ref("checkout", "start_point", self.start_point.as_deref())?))
        } else {
            Ok(GitCommand::new(["checkout"]).arg(target))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TagAction {
    #[default]
    List,
    Create,
    Delete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct TagOptions {
    #[arg(value_enum, default_value_t)]
    pub action: TagAction,
    pub name: Option<String>,
    /// Annotation message; creates an annotated tag
    #[arg(short, long)]
    pub message: Option<String>,
    /// Commit to tag (HEAD when omitted)
    #[arg(long)]
    pub target: Option<String>,
    /// Glob filter when listing
    #[arg(long)]
    pub pattern: Option<String>,
}

impl TagOptions {
    pub fn create(name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            action: TagAction::Create,
            name: Some(name.into()),
            message,
            ..Self::default()
        }
    }

    fn name(&self) -> Result<String, EngineError> {
        require_ref("tag", "name", self.name.as_deref().unwrap_or_default())
    }

    pub fn command(&self) -> Result<GitCommand, EngineError> {
        Ok(match self.action {
            TagAction::List => GitCommand::new(["tag", "--list"]).maybe_arg(optional_ref(
                "tag",
                "pattern",
                self.pattern.as_deref(),
            )?),
            TagAction::Create => {
                let name = self.name()?;
                let target = optional_ref("tag", "target", self.target.as_deref())?;
                match self.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
                    Some(message) => GitCommand::new(["tag", "-a"]).arg(name).arg("-m").arg(message),
                    None => GitCommand::new(["tag"]).arg(name),
                }
                .maybe_arg(target)
            }
            TagAction::Delete => GitCommand::new(["tag", "-d"]).arg(self.name()?),
        })
    }
}

impl GitEngine {
    pub async fn branch(&self, dir: &Path, options: &BranchOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("branch", dir);
        guarded!(self, builder);
        let command = options.command()?;

        match options.action {
            BranchAction::Create => {
                let name = options.name()?;
                if or_return!(self.ref_exists(&builder, &format!("refs/heads/{name}")).await) {
                    return Ok(builder.reject(
                        ErrorKind::InvalidReference,
                        format!("a branch named '{name}' already exists"),
                    ));
                }
            }
            BranchAction::Delete | BranchAction::Rename => {
                let name = options.name()?;
                if !or_return!(self.ref_exists(&builder, &format!("refs/heads/{name}")).await) {
                    return Ok(builder.reject(
                        ErrorKind::InvalidReference,
                        format!("branch '{name}' does not exist"),
                    ));
                }
            }
            BranchAction::List => {}
        }

        Ok(self.run(&builder, command, None).await)
    }

    /// Switch branches. With `create`, refuses when the branch already exists.
    pub async fn checkout(&self, dir: &Path, options: &CheckoutOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("checkout", dir);
        guarded!(self, builder);
        let command = options.command()?;

        if options.create {
            let target = options.target.trim();
            if or_return!(self.ref_exists(&builder, &format!("refs/heads/{target}")).await) {
                return Ok(builder.reject(
                    ErrorKind::InvalidReference,
                    format!("a branch named '{target}' already exists"),
                ));
            }
        }

        Ok(self.run(&builder, command, None).await)
    }

    pub async fn tag(&self, dir: &Path, options: &TagOptions) -> Result<OperationResult, EngineError> {
        let builder = ResultBuilder::start("tag", dir);
        guarded!(self, builder);
        let command = options.command()?;

        if options.action != TagAction::List {
            let name = options.name()?;
            let exists = or_return!(self.ref_exists(&builder, &format!("refs/tags/{name}")).await);
            match (options.action, exists) {
                (TagAction::Create, true) => {
                    return Ok(builder.reject(
                        ErrorKind::InvalidReference,
                        format!("tag '{name}' already exists"),
                    ))
                }
                (TagAction::Delete, false) => {
                    return Ok(builder.reject(
                        ErrorKind::InvalidReference,
                        format!("tag '{name}' does not exist"),
                    ))
                }
                _ => {}
            }
        }

        Ok(self.run(&builder, command, None).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::external::ScriptedExecutor;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_checkout_create_refuses_existing_branch() {
        let executor = Arc::new(
            ScriptedExecutor::new().ok("git rev-parse --verify --quiet refs/heads/feature", "abc123\n"),
        );
        let engine = engine_with(executor.clone());
        let options = CheckoutOptions {
            target: "feature".to_string(),
            create: true,
            start_point: None,
        };
        let result = engine.checkout(dir(), &options).await.unwrap();

        assert_eq!(result.error_kind, Some(ErrorKind::InvalidReference));
        assert!(!executor.was_called("git checkout -b feature"));
    }

    #[tokio::test]
    async fn test_branch_create_runs_when_absent() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .fail("git rev-parse --verify --quiet refs/heads/topic", 1, "")
                .ok("git branch topic", ""),
        );
        let engine = engine_with(executor.clone());
        let result = engine.branch(dir(), &BranchOptions::create("topic")).await.unwrap();

        assert!(result.succeeded());
        assert!(executor.was_called("git branch topic"));
    }

    #[tokio::test]
    async fn test_tag_delete_of_missing_tag_is_rejected() {
        let executor =
            Arc::new(ScriptedExecutor::new().fail("git rev-parse --verify --quiet refs/tags/v9.9.9", 1, ""));
        let engine = engine_with(executor);
        let options = TagOptions {
            action: TagAction::Delete,
            name: Some("v9.9.9".to_string()),
            ..TagOptions::default()
        };
        let result = engine.tag(dir(), &options).await.unwrap();
        assert_eq!(result.error_kind, Some(ErrorKind::InvalidReference));
    }

    #[test]
    fn test_tag_create_command() {
        let annotated = TagOptions::create("v1.0.0", Some("Release v1.0.0".to_string()));
        assert_eq!(
            annotated.command().unwrap().render(),
            "git tag -a v1.0.0 -m 'Release v1.0.0'"
        );
        let lightweight = TagOptions::create("v1.0.0", None);
        assert_eq!(lightweight.command().unwrap().render(), "git tag v1.0.0");
    }

    #[test]
    fn test_branch_rejects_option_like_names() {
        let options = BranchOptions::create("--force");
        assert!(matches!(options.command(), Err(EngineError::InvalidArgument { .. })));
        let rename = BranchOptions {
            action: BranchAction::Rename,
            name: Some("old".to_string()),
            ..BranchOptions::default()
        };
        assert!(matches!(rename.command(), Err(EngineError::MissingArgument { .. })));
    }
}
