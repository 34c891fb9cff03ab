use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use gitmate::cli::commands::{AliasesCommand, RunCommand, ServeCommand};
use gitmate::cli::{alias_argv, Cli, Commands};
use gitmate::config::{config, GitmateConfig};
use gitmate::engine::GitEngine;
use gitmate::identity::{IdentityResolver, InvocationContext};
use gitmate::request::OperationRequest;
use gitmate::telemetry::init_telemetry;

fn main() -> Result<ExitCode> {
    let base = config()?.clone();

    // Started under an alias name: run as `gitmate <operation> ...`
    let context = InvocationContext::capture(&base.identity);
    let cli = match alias_argv(&context, &IdentityResolver::from_config(&base.identity)) {
        Some(argv) => Cli::parse_from(argv),
        None => Cli::parse(),
    };

    let cwd = match &cli.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    let settings = match &cli.cwd {
        Some(dir) => GitmateConfig::load_from(dir)?,
        None => base,
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.observability.log_level.clone());
    init_telemetry(&level, settings.observability.json_logs)?;

    let engine = GitEngine::from_config(&settings);

    tokio::runtime::Runtime::new()?.block_on(async move {
        if let Some((operation, arguments)) = cli.command.operation()? {
            let request = OperationRequest {
                operation,
                working_directory: cwd,
                arguments,
                timeout_ms: cli.timeout_ms,
            };
            return RunCommand::new(engine, request).with_json(cli.json).execute().await;
        }

        match cli.command {
            Commands::Serve => ServeCommand::new(engine, cwd).execute().await?,
            Commands::Aliases { link } => AliasesCommand::new(link).with_json(cli.json).execute()?,
            _ => {}
        }
        Ok(ExitCode::SUCCESS)
    })
}
