// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Batch execution and the watch loop.
//!
//! A batch is one pass over the intake: build jobs, check them with
//! bounded concurrency, patch and report each as it completes. Watch mode
//! repeats batches forever with a fixed sleep between cycles; one cycle's
//! failure is logged, never fatal.

use futures::stream::{self, StreamExt};
use metrics::{counter, gauge};
use std::sync::Arc;
use tracing::{error, info};

use crate::application::check_service::{CheckService, JobIntake};
use crate::application::report;
use crate::domain::config::ConfigManifest;
use crate::domain::job::CheckJob;
use crate::infrastructure::report_file::RunReports;
use crate::infrastructure::slack::{notify_best_effort, upload_report_file, Notifier};

/// Per-run switches that don't belong in the config manifest.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub intake: JobIntake,
    pub include_unexpired_upload: bool,
    pub dry_run: bool,
    pub json_out: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BatchSummary {
    pub checked: usize,
    pub errored: usize,
    pub patched: usize,
}

pub struct Poller {
    service: Arc<CheckService>,
    notifier: Arc<dyn Notifier>,
    manifest: ConfigManifest,
}

impl Poller {
    pub fn new(
        service: Arc<CheckService>,
        notifier: Arc<dyn Notifier>,
        manifest: ConfigManifest,
    ) -> Self {
        Self {
            service,
            notifier,
            manifest,
        }
    }

    /// One full pass: intake, checks, patches, reports, notifications.
    pub async fn run_batch(
        &self,
        reports: &mut RunReports,
        options: &RunOptions,
    ) -> anyhow::Result<BatchSummary> {
        let workers = self.manifest.workers();
        let query = match &options.intake {
            JobIntake::Query(query) => query.as_str(),
            JobIntake::AccessionList(_) => "accession list",
            JobIntake::LocalFile(_) => "local file",
        };
        let banner = report::check_start_banner(
            &self.manifest.spec.portal.url,
            query,
            workers,
            options.dry_run,
        );
        notify_best_effort(self.notifier.as_ref(), &banner).await;
        reports.out.write_line(&banner)?;
        if !options.json_out {
            reports.out.write_line(report::TAB_REPORT_HEADER)?;
        }

        let jobs = self
            .service
            .build_jobs(&options.intake, options.include_unexpired_upload)
            .await?;
        let total = jobs.len();
        info!(total, workers, "batch built");
        gauge!("checkfiles.batch_size").set(total as f64);

        let mut summary = BatchSummary::default();
        let mut checked = stream::iter(jobs.into_iter().map(|mut job| {
            let service = Arc::clone(&self.service);
            async move {
                service.check(&mut job).await;
                job
            }
        }))
        .buffer_unordered(workers.max(1));

        while let Some(mut job) = checked.next().await {
            if !options.dry_run {
                self.service.patch(&mut job).await;
            }
            self.report_job(reports, options, &job)?;
            summary.checked += 1;
            counter!("checkfiles.files_checked").increment(1);
            if !job.errors.is_empty() {
                summary.errored += 1;
                counter!("checkfiles.files_errored").increment(1);
            }
            if job.patched {
                summary.patched += 1;
            }
        }

        let banner = report::check_finish_banner();
        reports.out.write_line(&banner)?;
        notify_best_effort(self.notifier.as_ref(), &banner).await;
        upload_report_file(self.notifier.as_ref(), reports.out.path()).await;
        upload_report_file(self.notifier.as_ref(), reports.err.path()).await;
        info!(
            checked = summary.checked,
            errored = summary.errored,
            patched = summary.patched,
            "batch finished"
        );
        Ok(summary)
    }

    fn report_job(
        &self,
        reports: &mut RunReports,
        options: &RunOptions,
        job: &CheckJob,
    ) -> std::io::Result<()> {
        let row = if options.json_out {
            report::json_row(job)
        } else {
            report::tab_row(job)
        };
        reports.out.write_line(&row)?;
        if !job.errors.is_empty() {
            reports.err.write_line(&row)?;
        }
        Ok(())
    }

    /// Batches forever with a fixed sleep between cycles. Ctrl-c finishes
    /// the in-flight batch, then exits.
    pub async fn watch(&self, options: &RunOptions) -> anyhow::Result<()> {
        let interval = self.manifest.spec.watch.interval;
        info!(interval = ?interval, "watch mode");
        loop {
            let mut reports = RunReports::from_paths(
                self.manifest.spec.reports.out.as_deref(),
                self.manifest.spec.reports.err.as_deref(),
            )?;
            if let Err(e) = self.run_batch(&mut reports, options).await {
                error!(error = %e, "polling cycle failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted; leaving watch mode");
                    return Ok(());
                }
            }
        }
    }
}
