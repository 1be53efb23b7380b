// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # checkfiles CLI
//!
//! The `checkfiles` binary drives the validation harness for the data
//! coordination center.
//!
//! ## Commands
//!
//! - `checkfiles run` - One checking pass over files awaiting approval
//! - `checkfiles watch` - Poll forever with a fixed sleep between passes
//! - `checkfiles experiments` - Audit experiment submission readiness
//! - `checkfiles md5-audit` - Flag files sharing an md5sum
//! - `checkfiles deploy` - Provision a harness instance in the cloud
//! - `checkfiles config show|validate|generate` - Configuration management
//!
//! Configuration comes from a manifest file (see `config generate`), with
//! command-line flags and environment variables taking precedence.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::check::CheckArgs;
use commands::config::ConfigCommand;
use commands::deploy::DeployArgs;
use commands::experiments::ExperimentArgs;
use commands::md5::Md5Args;

/// Validation harness for files awaiting approval
#[derive(Parser)]
#[command(name = "checkfiles")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration manifest (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CHECKFILES_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CHECKFILES_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One checking pass over files awaiting approval
    #[command(name = "run")]
    Run {
        #[command(flatten)]
        args: CheckArgs,
    },

    /// Poll forever with a fixed sleep between passes
    #[command(name = "watch")]
    Watch {
        #[command(flatten)]
        args: CheckArgs,
    },

    /// Audit experiment submission readiness
    #[command(name = "experiments")]
    Experiments {
        #[command(flatten)]
        args: ExperimentArgs,
    },

    /// Flag files sharing an md5sum
    #[command(name = "md5-audit")]
    Md5Audit {
        #[command(flatten)]
        args: Md5Args,
    },

    /// Provision a harness instance in the cloud
    #[command(name = "deploy")]
    Deploy {
        #[command(flatten)]
        args: DeployArgs,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; missing files are fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Run { args } => commands::check::execute(cli.config, args, false).await,
        Commands::Watch { args } => commands::check::execute(cli.config, args, true).await,
        Commands::Experiments { args } => commands::experiments::execute(cli.config, args).await,
        Commands::Md5Audit { args } => commands::md5::execute(cli.config, args).await,
        Commands::Deploy { args } => commands::deploy::execute(args).await,
        Commands::Config { command } => commands::config::execute(cli.config, command).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_with_flags() {
        let cli = Cli::try_parse_from([
            "checkfiles",
            "run",
            "https://portal.test",
            "--search-query",
            "accession=ABC123",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { args } => {
                assert_eq!(args.url.as_deref(), Some("https://portal.test"));
                assert_eq!(args.search_query.as_deref(), Some("accession=ABC123"));
                assert!(args.dry_run);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn cli_parses_deploy_with_harness_args() {
        let cli = Cli::try_parse_from([
            "checkfiles",
            "deploy",
            "--instance-type",
            "c5.9xlarge",
            "--",
            "watch",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Deploy { args } => {
                assert_eq!(args.instance_type, "c5.9xlarge");
                assert_eq!(args.harness_args, vec!["watch", "--dry-run"]);
            }
            _ => panic!("expected deploy"),
        }
    }
}
