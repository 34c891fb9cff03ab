use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use super::aliases::lookup;
use crate::config::IdentityConfig;

/// Last access time of an alias wrapper script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperAccess {
    pub path: PathBuf,
    pub accessed: SystemTime,
}

/// Everything the resolver may look at, captured once so heuristics stay pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// `argv[0]` as the process received it
    pub program: String,
    pub args: Vec<String>,
    /// Parent process command line, space-joined
    pub parent_command_line: Option<String>,
    /// Command text a shell left in the environment (e.g. `$_`)
    pub typed_command: Option<String>,
    pub wrapper_accesses: Vec<WrapperAccess>,
    pub now: SystemTime,
}

impl InvocationContext {
    /// Context with only `argv`, as tests and the protocol server use it.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        Self {
            program: args.next().unwrap_or_default(),
            args: args.collect(),
            parent_command_line: None,
            typed_command: None,
            wrapper_accesses: Vec::new(),
            now: SystemTime::now(),
        }
    }

    /// Snapshot of the running process.
    pub fn capture(config: &IdentityConfig) -> Self {
        let mut context = Self::from_args(std::env::args());
        context.parent_command_line = parent_command_line();
        context.typed_command = config
            .env_vars
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()));
        if let Some(dir) = &config.wrapper_dir {
            context.wrapper_accesses = wrapper_accesses(dir);
        }
        debug!(
            program = %context.program,
            parent = ?context.parent_command_line,
            typed = ?context.typed_command,
            wrappers = context.wrapper_accesses.len(),
            "Captured invocation context"
        );
        context
    }
}

#[cfg(target_os = "linux")]
fn parent_command_line() -> Option<String> {
    let ppid = std::os::unix::process::parent_id();
    let raw = std::fs::read(format!("/proc/{ppid}/cmdline")).ok()?;
    let line = raw
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    (!line.is_empty()).then_some(line)
}

#[cfg(not(target_os = "linux"))]
fn parent_command_line() -> Option<String> {
    None
}

/// Access times of the files in `dir` whose names are known aliases.
fn wrapper_accesses(dir: &Path) -> Vec<WrapperAccess> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter(|entry| lookup(&entry.file_name().to_string_lossy()).is_some())
        .filter_map(|entry| {
            let accessed = entry.metadata().ok()?.accessed().ok()?;
            Some(WrapperAccess {
                path: entry.path(),
                accessed,
            })
        })
        .collect()
}
