//! Ordered heuristics deciding which operation an alias invocation meant
//!
//! Each heuristic is a plain function of the captured context; the first one
//! with an answer wins. The last heuristic, most recently accessed wrapper
//! script, is best-effort only: two aliases invoked within the same
//! freshness window can be confused for each other.

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::aliases::{alias_candidates, lookup};
use super::context::InvocationContext;
use crate::config::IdentityConfig;
use crate::request::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    DirectArgument,
    ParentProcess,
    ShellEnvironment,
    RecentWrapper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub operation: Operation,
    pub source: ResolutionSource,
}

type Heuristic = fn(&InvocationContext, Duration) -> Option<Operation>;

/// The name the process was started under.
pub fn direct_argument(context: &InvocationContext, _window: Duration) -> Option<Operation> {
    lookup(&context.program)
}

/// First alias-shaped token on the parent's command line, e.g. the wrapper
/// script a shell is interpreting.
pub fn parent_process(context: &InvocationContext, _window: Duration) -> Option<Operation> {
    let line = context.parent_command_line.as_deref()?;
    alias_candidates(line).iter().find_map(|candidate| lookup(candidate))
}

/// Command a shell recorded in the environment before exec.
pub fn shell_environment(context: &InvocationContext, _window: Duration) -> Option<Operation> {
    let typed = context.typed_command.as_deref()?;
    lookup(typed.split_whitespace().next()?)
}

/// Most recently accessed wrapper script, if accessed within `window`.
pub fn recent_wrapper(context: &InvocationContext, window: Duration) -> Option<Operation> {
    context
        .wrapper_accesses
        .iter()
        .filter(|access| match context.now.duration_since(access.accessed) {
            Ok(age) => age <= window,
            // accessed "after" now: clock skew, treat as just accessed
            Err(_) => true,
        })
        .max_by_key(|access| access.accessed)
        .and_then(|access| lookup(&access.path.to_string_lossy()))
}

pub struct IdentityResolver {
    freshness_window: Duration,
    heuristics: Vec<(ResolutionSource, Heuristic)>,
}

impl IdentityResolver {
    pub fn new(freshness_window: Duration) -> Self {
        Self {
            freshness_window,
            heuristics: vec![
                (ResolutionSource::DirectArgument, direct_argument as Heuristic),
                (ResolutionSource::ParentProcess, parent_process as Heuristic),
                (ResolutionSource::ShellEnvironment, shell_environment as Heuristic),
                (ResolutionSource::RecentWrapper, recent_wrapper as Heuristic),
            ],
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(Duration::from_millis(config.freshness_window_ms))
    }

    pub fn resolve(&self, context: &InvocationContext) -> Option<Resolution> {
        let resolution = self.heuristics.iter().find_map(|(source, heuristic)| {
            heuristic(context, self.freshness_window).map(|operation| Resolution {
                operation,
                source: *source,
            })
        });
        debug!(?resolution, program = %context.program, "Resolved invocation identity");
        resolution
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::from_config(&IdentityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::WrapperAccess;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn context(program: &str) -> InvocationContext {
        InvocationContext::from_args([program])
    }

    fn access(name: &str, now: SystemTime, age: Duration) -> WrapperAccess {
        WrapperAccess {
            path: PathBuf::from("/opt/aliases").join(name),
            accessed: now - age,
        }
    }

    #[test]
    fn test_direct_argument_beats_parent_process() {
        let mut ctx = context("/usr/local/bin/gcommit");
        ctx.parent_command_line = Some("bash /usr/local/bin/gpush".to_string());

        let resolution = IdentityResolver::default().resolve(&ctx).unwrap();
        assert_eq!(resolution.operation, Operation::Commit);
        assert_eq!(resolution.source, ResolutionSource::DirectArgument);
    }

    #[test]
    fn test_parent_process_when_program_is_generic() {
        let mut ctx = context("gitmate");
        ctx.parent_command_line = Some("/bin/bash /home/dev/bin/git-rebase.sh main".to_string());

        let resolution = IdentityResolver::default().resolve(&ctx).unwrap();
        assert_eq!(resolution.operation, Operation::Rebase);
        assert_eq!(resolution.source, ResolutionSource::ParentProcess);
    }

    #[test]
    fn test_shell_environment() {
        let mut ctx = context("gitmate");
        ctx.typed_command = Some("/usr/local/bin/gstash".to_string());
        assert_eq!(shell_environment(&ctx, Duration::ZERO), Some(Operation::Stash));

        let resolution = IdentityResolver::default().resolve(&ctx).unwrap();
        assert_eq!(resolution.source, ResolutionSource::ShellEnvironment);
    }

    #[test]
    fn test_recent_wrapper_respects_freshness_window() {
        let mut ctx = context("gitmate");
        let now = ctx.now;
        ctx.wrapper_accesses = vec![
            access("gsync", now, Duration::from_secs(60)),
            access("gtag", now, Duration::from_millis(500)),
        ];
        let window = Duration::from_secs(3);
        assert_eq!(recent_wrapper(&ctx, window), Some(Operation::Tag));

        ctx.wrapper_accesses = vec![access("gsync", now, Duration::from_secs(60))];
        assert_eq!(recent_wrapper(&ctx, window), None);
    }

    #[test]
    fn test_nothing_matches() {
        let ctx = context("gitmate");
        assert!(IdentityResolver::default().resolve(&ctx).is_none());
    }
}
