use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for gitmate
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitmateConfig {
    /// How commands are spawned
    pub execution: ExecutionConfig,
    /// Defaults used by the composite workflows
    pub workflows: WorkflowConfig,
    /// Alias identity resolution
    pub identity: IdentityConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Per-command timeout
    pub timeout_ms: u64,
    /// Timeout for the repository check run before every guarded operation
    pub guard_timeout_ms: u64,
    /// The only program the executor will spawn
    pub program: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            guard_timeout_ms: 3_000,
            program: "git".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub default_remote: String,
    /// Branch that `clean` measures merged branches against and `dev` starts from
    pub base_branch: String,
    /// Never deleted by `clean`
    pub protected_branches: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_remote: "origin".to_string(),
            base_branch: "main".to_string(),
            protected_branches: vec!["main".to_string(), "master".to_string(), "develop".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// How recent a wrapper script access must be to count
    pub freshness_window_ms: u64,
    /// Directory holding the alias wrapper scripts, if any
    pub wrapper_dir: Option<PathBuf>,
    /// Environment variables that may hold the originally typed command
    pub env_vars: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: 3_000,
            wrapper_dir: None,
            env_vars: vec!["_".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl GitmateConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (gitmate.toml, .gitmaterc)
    /// 3. Environment variables (prefixed with GITMATE_, sections split by `__`)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`load`](Self::load) with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        let toml_file = dir.join("gitmate.toml");
        if toml_file.exists() {
            builder = builder.add_source(File::from(toml_file).format(FileFormat::Toml));
        }

        let rc_file = dir.join(".gitmaterc");
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("GITMATE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("workflows.protected_branches")
                .with_list_parse_key("identity.env_vars")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::debug!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<GitmateConfig, anyhow::Error>> = std::sync::LazyLock::new(|| {
    // .env first so its values take part in the environment layer
    let _ = GitmateConfig::load_env_file();
    GitmateConfig::load()
});

/// Get the global configuration
pub fn config() -> Result<&'static GitmateConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
