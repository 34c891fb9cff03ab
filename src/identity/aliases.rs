//! Alias names that route to operations
//!
//! Every operation answers to `g<name>` with dashes removed (`gadd`,
//! `gcherrypick`) and to `git-<name>` (`git-add`, `git-cherry-pick`).

use regex::Regex;
use serde::Serialize;
use std::path::Path;

use crate::request::Operation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alias {
    pub name: String,
    pub operation: Operation,
}

/// Every alias, short form first, in operation order.
pub fn alias_table() -> Vec<Alias> {
    Operation::ALL
        .iter()
        .flat_map(|&operation| {
            [
                Alias {
                    name: format!("g{}", operation.as_str().replace('-', "")),
                    operation,
                },
                Alias {
                    name: format!("git-{}", operation.as_str()),
                    operation,
                },
            ]
        })
        .collect()
}

/// Lowercased file name without directories or extension (`/usr/bin/gadd.sh` -> `gadd`).
pub fn normalize(name: &str) -> String {
    let base = Path::new(name.trim())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match base.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base,
    };
    stem.to_ascii_lowercase()
}

/// Operation an alias name (or a path to an alias wrapper) stands for.
pub fn lookup(name: &str) -> Option<Operation> {
    let name = normalize(name);
    if name.is_empty() {
        return None;
    }
    alias_table()
        .into_iter()
        .find(|alias| alias.name == name)
        .map(|alias| alias.operation)
}

/// Tokens in `command_line` shaped like an alias name, in order of appearance.
pub fn alias_candidates(command_line: &str) -> Vec<String> {
    let Ok(shape) = Regex::new(r"(?:^|/)(g[a-z]+|git-[a-z][a-z-]*)(?:\.[a-z]+)?$") else {
        return Vec::new();
    };
    command_line
        .split_whitespace()
        .filter_map(|token| {
            let token = token.to_ascii_lowercase();
            shape
                .captures(&token)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_alias_forms_resolve() {
        assert_eq!(lookup("gadd"), Some(Operation::Add));
        assert_eq!(lookup("git-add"), Some(Operation::Add));
        assert_eq!(lookup("gcherrypick"), Some(Operation::CherryPick));
        assert_eq!(lookup("git-cherry-pick"), Some(Operation::CherryPick));
        assert_eq!(lookup("gflow"), Some(Operation::Flow));
    }

    #[test]
    fn test_lookup_normalizes_paths_and_extensions() {
        assert_eq!(lookup("/usr/local/bin/gcommit"), Some(Operation::Commit));
        assert_eq!(lookup("gsync.sh"), Some(Operation::Sync));
        assert_eq!(lookup("GPUSH"), Some(Operation::Push));
        assert_eq!(lookup("git"), None);
        assert_eq!(lookup("gitmate"), None);
        assert_eq!(lookup(""), None);
    }

    #[test]
    fn test_alias_names_are_unique() {
        let table = alias_table();
        let mut names: Vec<&str> = table.iter().map(|a| a.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), table.len());
        assert_eq!(table.len(), Operation::ALL.len() * 2);
    }

    #[test]
    fn test_alias_candidates_in_command_line() {
        let candidates = alias_candidates("bash /home/dev/.local/bin/gmerge.sh feature");
        assert!(candidates.contains(&"gmerge".to_string()));
        assert!(alias_candidates("/bin/zsh -l").is_empty());
    }
}
