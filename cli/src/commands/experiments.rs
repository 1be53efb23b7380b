// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `experiments`: submission-readiness audit.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use checkfiles_core::application::experiment_audit::{
    ExperimentAuditService, ExperimentIntake,
};
use checkfiles_core::infrastructure::report_file::RunReports;

use super::{resolve_portal, PortalOverrides};

#[derive(Args, Debug)]
pub struct ExperimentArgs {
    /// Portal base URL (overrides the config manifest)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// HTTP username (access_key_id)
    #[arg(short = 'u', long, env = "CHECKFILES_ACCESS_KEY_ID")]
    pub username: Option<String>,

    /// HTTP password (secret_access_key)
    #[arg(short = 'p', long, env = "CHECKFILES_SECRET_ACCESS_KEY")]
    pub password: Option<String>,

    /// Slack bot token
    #[arg(long, env = "CHECKFILES_BOT_TOKEN")]
    pub bot_token: Option<String>,

    /// File to write report rows with or without errors
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,

    /// File to write report rows with errors
    #[arg(short = 'e', long)]
    pub err: Option<PathBuf>,

    /// Override the experiment search query, e.g. 'accession=XYZ789'
    #[arg(long, default_value = "status=proposed&status=started")]
    pub search_query: String,

    /// File with a list of experiment accessions to check
    #[arg(long)]
    pub accessions_list: Option<PathBuf>,

    /// Don't update status, just check
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(config_path: Option<PathBuf>, args: ExperimentArgs) -> Result<()> {
    let (_manifest, portal, notifier) = resolve_portal(
        config_path,
        PortalOverrides {
            url: args.url,
            username: args.username,
            password: args.password,
            bot_token: args.bot_token,
        },
    )?;

    let intake = match args.accessions_list {
        Some(path) => ExperimentIntake::AccessionList(path),
        None => ExperimentIntake::Query(args.search_query),
    };
    let mut reports = RunReports::from_paths(args.out.as_deref(), args.err.as_deref())?;
    let service = ExperimentAuditService::new(portal, notifier);
    let summary = service.run(&mut reports, &intake, args.dry_run).await?;

    println!(
        "{} {} experiments: {} ready, {} below depth, {} with audit errors",
        "✓".green(),
        summary.experiments,
        summary.submitted,
        summary.depth_failures,
        summary.audit_failures,
    );
    Ok(())
}
