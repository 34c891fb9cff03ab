use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Instrument;

use super::{preview, WorkflowRun};
use crate::engine::{
    failure_from_output, EngineError, ErrorKind, GitEngine, OperationResult, PushOptions, ResultBuilder,
    TagOptions,
};
use crate::external::GitCommand;
use crate::observability::create_workflow_span;

const VERSION_PATTERN: &str = r"^v?(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(-[0-9A-Za-z][0-9A-Za-z.-]*)?$";

/// Tag name for `version`, always `v`-prefixed. Rejects anything that is
/// not `MAJOR.MINOR.PATCH` with an optional pre-release suffix.
pub fn release_tag_name(version: &str) -> Result<String, EngineError> {
    let version = version.trim();
    if version.is_empty() {
        return Err(EngineError::missing("release", "version"));
    }
    let valid = Regex::new(VERSION_PATTERN)
        .map(|re| re.is_match(version))
        .unwrap_or(false);
    if !valid {
        return Err(EngineError::invalid(
            "release",
            "version",
            format!("'{version}' is not of the form [v]MAJOR.MINOR.PATCH[-pre]"),
        ));
    }
    Ok(if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{version}")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct ReleaseOptions {
    /// Version to release, e.g. 1.4.0 or v2.0.0-rc.1
    pub version: String,
    /// Tag annotation (defaults to "Release <tag>")
    #[arg(short, long)]
    pub message: Option<String>,
    #[arg(long)]
    pub remote: Option<String>,
    #[arg(long)]
    pub dry_run: bool,
}

impl ReleaseOptions {
    fn tag(&self, tag_name: &str) -> TagOptions {
        let message = self
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Release {tag_name}"));
        TagOptions::create(tag_name, Some(message))
    }

    fn push(&self, tag_name: &str) -> PushOptions {
        PushOptions {
            remote: self.remote.clone(),
            branch: Some(tag_name.to_string()),
            ..PushOptions::default()
        }
    }
}

fn clean_tree_probe() -> GitCommand {
    GitCommand::new(["status", "--porcelain", "--untracked-files=no"])
}

impl GitEngine {
    pub async fn release(&self, dir: &Path, options: &ReleaseOptions) -> Result<WorkflowRun, EngineError> {
        let mut run = WorkflowRun::new("release", options.dry_run);
        let span = create_workflow_span("release", &run.correlation_id);
        self.release_steps(dir, options, &mut run).instrument(span).await?;
        run.log_finished();
        Ok(run)
    }

    async fn release_steps(
        &self,
        dir: &Path,
        options: &ReleaseOptions,
        run: &mut WorkflowRun,
    ) -> Result<(), EngineError> {
        let tag_name = release_tag_name(&options.version)?;
        let tag = options.tag(&tag_name);
        let push = options.push(&tag_name);
        let tag_command = tag.command()?;
        let push_command = push.command(&self.settings().default_remote)?;

        if run.dry_run {
            step!(run, preview("release-validate", dir, clean_tree_probe()));
            step!(run, preview("tag", dir, tag_command));
            step!(run, preview("push", dir, push_command));
            return Ok(());
        }

        step!(run, self.validate_release(dir, &tag_name).await);
        step!(run, self.tag(dir, &tag).await?);
        step!(run, self.push(dir, &push).await?);
        Ok(())
    }

    /// Clean tracked files and an unused tag name; read-only.
    async fn validate_release(&self, dir: &Path, tag_name: &str) -> OperationResult {
        let builder = ResultBuilder::start("release-validate", dir);
        if let Some(rejected) = self.ensure_repository(&builder).await {
            return rejected;
        }

        let probe = clean_tree_probe();
        let status = match self.probe(&builder, probe.clone()).await {
            Ok(output) if output.success() => output,
            Ok(output) => return builder.build(failure_from_output(probe, &output)),
            Err(result) => return result,
        };
        let dirty: Vec<&str> = status.stdout.lines().filter(|l| !l.trim().is_empty()).collect();
        if !dirty.is_empty() {
            return builder.reject(
                ErrorKind::Unknown,
                format!(
                    "working tree has {} uncommitted change(s); commit or stash them before releasing",
                    dirty.len()
                ),
            );
        }

        match self.ref_exists(&builder, &format!("refs/tags/{tag_name}")).await {
            Ok(true) => builder.reject(
                ErrorKind::InvalidReference,
                format!("tag '{tag_name}' already exists"),
            ),
            Ok(false) => builder.success_message(vec![format!(
                "{tag_name}: version valid, working tree clean, tag available"
            )]),
            Err(result) => result,
        }
    }
}
