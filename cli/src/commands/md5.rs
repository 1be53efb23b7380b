// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `md5-audit`: flag files sharing an md5sum.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use checkfiles_core::application::md5_audit::Md5AuditService;
use checkfiles_core::infrastructure::report_file::ReportSink;

use super::{resolve_portal, PortalOverrides};

#[derive(Args, Debug)]
pub struct Md5Args {
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

    /// File to write audit rows
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,

    /// Don't update matching_md5sum, just check
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(config_path: Option<PathBuf>, args: Md5Args) -> Result<()> {
    let (_manifest, portal, notifier) = resolve_portal(
        config_path,
        PortalOverrides {
            url: args.url,
            username: args.username,
            password: args.password,
            bot_token: args.bot_token,
        },
    )?;

    let mut out = match args.out.as_deref() {
        Some(path) => ReportSink::file(path)?,
        None => ReportSink::stdout(),
    };
    let service = Md5AuditService::new(portal, notifier);
    let summary = service.run(&mut out, args.dry_run).await?;

    println!(
        "{} {} files scanned, {} duplicate groups, {} patched",
        "✓".green(),
        summary.files_seen,
        summary.groups,
        summary.patched,
    );
    Ok(())
}
