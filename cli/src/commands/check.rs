// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `run` and `watch`: the file-checking passes.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use checkfiles_core::application::check_service::{CheckService, JobIntake};
use checkfiles_core::application::poller::{Poller, RunOptions};
use checkfiles_core::infrastructure::report_file::RunReports;

use super::{resolve_portal, PortalOverrides};

#[derive(Args, Debug)]
pub struct CheckArgs {
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

    /// Mount point of the object-store mirror
    #[arg(long)]
    pub mirror: Option<PathBuf>,

    /// Reference data location for validateFiles
    #[arg(long = "enc-val-data")]
    pub enc_valdata: Option<PathBuf>,

    /// File to write report rows with or without errors
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,

    /// File to write report rows with errors
    #[arg(short = 'e', long)]
    pub err: Option<PathBuf>,

    /// Concurrent checks per batch; defaults to cpu count
    #[arg(long)]
    pub workers: Option<usize>,

    /// Override the file search query, e.g. 'accession=ABC123'
    #[arg(long)]
    pub search_query: Option<String>,

    /// File with a list of file accessions to check
    #[arg(long)]
    pub file_list: Option<PathBuf>,

    /// Path to a local file to check
    #[arg(long)]
    pub local_file: Option<PathBuf>,

    /// Include files whose upload credentials have not yet expired
    /// (may be replaced!)
    #[arg(long)]
    pub include_unexpired_upload: bool,

    /// Don't update status, just check
    #[arg(long)]
    pub dry_run: bool,

    /// Output results as JSON lines
    #[arg(long)]
    pub json_out: bool,
}

pub async fn execute(config_path: Option<PathBuf>, args: CheckArgs, watch: bool) -> Result<()> {
    let (mut manifest, portal, notifier) = resolve_portal(
        config_path,
        PortalOverrides {
            url: args.url,
            username: args.username,
            password: args.password,
            bot_token: args.bot_token,
        },
    )?;
    if let Some(mirror) = args.mirror {
        manifest.spec.checks.mirror = mirror;
    }
    if let Some(enc_valdata) = args.enc_valdata {
        manifest.spec.checks.enc_valdata = enc_valdata;
    }
    if let Some(workers) = args.workers {
        manifest.spec.checks.workers = Some(workers);
    }
    if let Some(out) = args.out {
        manifest.spec.reports.out = Some(out);
    }
    if let Some(err) = args.err {
        manifest.spec.reports.err = Some(err);
    }
    if let Some(search_query) = args.search_query {
        manifest.spec.checks.search_query = search_query;
    }
    manifest.validate()?;

    let intake = if let Some(file_list) = args.file_list {
        JobIntake::AccessionList(file_list)
    } else if let Some(local_file) = args.local_file {
        JobIntake::LocalFile(local_file)
    } else {
        JobIntake::Query(manifest.spec.checks.search_query.clone())
    };
    let options = RunOptions {
        intake,
        include_unexpired_upload: args.include_unexpired_upload,
        dry_run: args.dry_run,
        json_out: args.json_out || manifest.spec.reports.json_out,
    };

    let service = Arc::new(CheckService::new(portal, manifest.spec.checks.clone()));
    let poller = Poller::new(service, notifier, manifest.clone());

    if watch {
        if let Some(port) = manifest.spec.watch.metrics_port {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .with_http_listener(([0, 0, 0, 0], port))
                .install()
                .context("Failed to start metrics exporter")?;
            info!(port, "metrics exporter listening");
        }
        poller.watch(&options).await
    } else {
        let mut reports = RunReports::from_paths(
            manifest.spec.reports.out.as_deref(),
            manifest.spec.reports.err.as_deref(),
        )?;
        let summary = poller.run_batch(&mut reports, &options).await?;
        info!(
            checked = summary.checked,
            errored = summary.errored,
            patched = summary.patched,
            "run complete"
        );
        Ok(())
    }
}
