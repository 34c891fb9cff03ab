use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::identity::alias_table;

/// Symlink every alias name in `dir` to `target`. Names that already exist
/// are left untouched. Returns how many links were created.
#[cfg(unix)]
pub fn link_aliases(dir: &Path, target: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let mut created = 0;
    for alias in alias_table() {
        let link = dir.join(&alias.name);
        if link.symlink_metadata().is_ok() {
            debug!(path = %link.display(), "Alias already present, skipping");
            continue;
        }
        std::os::unix::fs::symlink(target, &link)
            .with_context(|| format!("cannot link {}", link.display()))?;
        created += 1;
    }
    info!(dir = %dir.display(), created, "Linked alias names");
    Ok(created)
}

#[cfg(not(unix))]
pub fn link_aliases(_dir: &Path, _target: &Path) -> Result<usize> {
    anyhow::bail!("alias links need symlink support")
}

pub struct AliasesCommand {
    link: Option<PathBuf>,
    json: bool,
}

impl AliasesCommand {
    pub fn new(link: Option<PathBuf>) -> Self {
        Self { link, json: false }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn execute(&self) -> Result<()> {
        if let Some(dir) = &self.link {
            let target = std::env::current_exe().context("cannot locate the gitmate binary")?;
            let created = link_aliases(dir, &target)?;
            println!("linked {created} alias(es) in {}", dir.display());
            return Ok(());
        }

        let table = alias_table();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&table)?);
            return Ok(());
        }
        // short and long forms come in pairs
        for pair in table.chunks(2) {
            let operation = pair[0].operation;
            let long = pair.get(1).map(|a| a.name.as_str()).unwrap_or_default();
            println!("{:<14} {:<18} {}", pair[0].name, long, operation.description());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_link_aliases_skips_existing_names() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("gitmate");
        std::fs::write(&target, "").unwrap();
        let bin = tmp.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        std::fs::write(bin.join("gadd"), "#!/bin/sh\n").unwrap();

        let created = link_aliases(&bin, &target).unwrap();
        assert_eq!(created, alias_table().len() - 1);
        assert!(bin.join("gcommit").symlink_metadata().unwrap().file_type().is_symlink());
        assert!(!bin.join("gadd").symlink_metadata().unwrap().file_type().is_symlink());

        assert_eq!(link_aliases(&bin, &target).unwrap(), 0);
    }
}
