// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `config`: show, validate, and generate configuration manifests.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use checkfiles_core::domain::config::ConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration after discovery and defaults
    Show,

    /// Check a manifest file without loading it into a run
    Validate {
        /// Manifest file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print a commented starter manifest
    Generate,
}

pub async fn execute(config_path: Option<PathBuf>, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let manifest = ConfigManifest::load(config_path.as_deref())?;
            let yaml =
                serde_yaml::to_string(&manifest).context("could not serialize configuration")?;
            print!("{yaml}");
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            match ConfigManifest::from_path(&file) {
                Ok(_) => {
                    println!("{} {} is valid", "✓".green(), file.display());
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{} {}", "✗".red(), e);
                    std::process::exit(1);
                }
            }
        }
        ConfigCommand::Generate => {
            print!("{}", ConfigManifest::example_yaml());
            Ok(())
        }
    }
}
