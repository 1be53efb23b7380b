// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Experiment submission audit.
//!
//! An experiment is ready to move to `submitted` when every live replicate
//! has fastq files on record, the summed read depth clears the assay's
//! floor, and the portal audit shows no ERROR / NOT_COMPLIANT findings.
//! The audit only reports; curators flip the status.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use checkfiles_portal::{
    AwardRecord, ExperimentRecord, FileRecord, PortalClient, PortalError, ReplicateRecord,
};

use crate::application::report;
use crate::domain::experiment::{
    minimum_read_depth, EXCLUDED_FASTQ_STATUSES, MODENCODE_MIN_DEPTH, MODENCODE_RFA,
};
use crate::infrastructure::report_file::RunReports;
use crate::infrastructure::slack::{notify_best_effort, upload_report_file, Notifier};

#[derive(Debug, Clone)]
pub enum ExperimentIntake {
    /// Raw search query fragment, e.g. `status=proposed&status=started`.
    Query(String),
    /// File with one experiment accession per line.
    AccessionList(PathBuf),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExperimentAuditSummary {
    pub experiments: usize,
    pub submitted: usize,
    pub depth_failures: usize,
    pub audit_failures: usize,
}

pub struct ExperimentAuditService {
    portal: Arc<PortalClient>,
    notifier: Arc<dyn Notifier>,
}

impl ExperimentAuditService {
    pub fn new(portal: Arc<PortalClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self { portal, notifier }
    }

    pub async fn run(
        &self,
        reports: &mut RunReports,
        intake: &ExperimentIntake,
        dry_run: bool,
    ) -> anyhow::Result<ExperimentAuditSummary> {
        let query = match intake {
            ExperimentIntake::Query(query) => query.clone(),
            ExperimentIntake::AccessionList(_) => "accession list".to_owned(),
        };
        let banner =
            report::experiment_start_banner(self.portal.base_url().as_str(), &query, dry_run);
        reports.out.write_line(&banner)?;
        notify_best_effort(self.notifier.as_ref(), &banner).await;

        let experiments = self.fetch_experiments(intake).await?;
        let mut summary = ExperimentAuditSummary {
            experiments: experiments.len(),
            ..ExperimentAuditSummary::default()
        };
        info!(count = experiments.len(), "experiments to audit");

        for experiment in &experiments {
            match self.audit_experiment(experiment).await {
                Err(e) => {
                    warn!(
                        accession = experiment.accession.as_deref().unwrap_or("UNKNOWN"),
                        error = %e,
                        "experiment skipped"
                    );
                }
                Ok(None) => {}
                Ok(Some(Verdict::Submitted { rfa, newest })) => {
                    summary.submitted += 1;
                    reports.out.write_line(&format!(
                        "{rfa}\t{}\t{}\t-> submitted\t{newest}",
                        experiment.accession.as_deref().unwrap_or("UNKNOWN"),
                        experiment.status,
                    ))?;
                }
                Ok(Some(Verdict::ShallowReplicate {
                    rfa,
                    replicate,
                    reads,
                    expected,
                })) => {
                    summary.depth_failures += 1;
                    reports.err.write_line(&format!(
                        "{rfa}\t{}\t{replicate}\treads_count={reads}\texpected count={expected}",
                        experiment.accession.as_deref().unwrap_or("UNKNOWN"),
                    ))?;
                }
                Ok(Some(Verdict::AuditErrors { rfa })) => {
                    summary.audit_failures += 1;
                    reports.err.write_line(&format!(
                        "{rfa}\t{}\taudit errors",
                        experiment.accession.as_deref().unwrap_or("UNKNOWN"),
                    ))?;
                }
            }
        }

        let banner = report::experiment_finish_banner();
        reports.out.write_line(&banner)?;
        notify_best_effort(self.notifier.as_ref(), &banner).await;
        upload_report_file(self.notifier.as_ref(), reports.out.path()).await;
        upload_report_file(self.notifier.as_ref(), reports.err.path()).await;
        Ok(summary)
    }

    async fn fetch_experiments(
        &self,
        intake: &ExperimentIntake,
    ) -> Result<Vec<ExperimentRecord>, anyhow::Error> {
        let graph = match intake {
            ExperimentIntake::Query(query) => {
                self.portal
                    .search_graph(&format!(
                        "/search/?type=Experiment&format=json&frame=object&limit=all&{query}"
                    ))
                    .await?
            }
            ExperimentIntake::AccessionList(path) => {
                let content = tokio::fs::read_to_string(path).await?;
                let mut graph = Vec::new();
                for accession in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    graph.extend(
                        self.portal
                            .search_graph(&format!(
                                "/search/?field=@id&frame=object&limit=all&type=Experiment&accession={accession}"
                            ))
                            .await?,
                    );
                }
                graph
            }
        };
        Ok(graph
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect())
    }

    async fn audit_experiment(
        &self,
        experiment: &ExperimentRecord,
    ) -> Result<Option<Verdict>, PortalError> {
        let rfa = match &experiment.award {
            Some(award) => {
                let award: AwardRecord =
                    serde_json::from_value(self.portal.fetch_object(award).await?)
                        .unwrap_or_default();
                award.rfa.unwrap_or_else(|| "UNKNOWN".to_owned())
            }
            None => "UNKNOWN".to_owned(),
        };

        let mut replicates: BTreeSet<String> = BTreeSet::new();
        let mut replicate_reads: BTreeMap<String, u64> = BTreeMap::new();
        for replicate_id in &experiment.replicates {
            let replicate: ReplicateRecord =
                serde_json::from_value(self.portal.fetch_object(replicate_id).await?)
                    .unwrap_or_default();
            if replicate.status != "deleted" {
                replicates.insert(replicate.id.clone());
                replicate_reads.insert(replicate.id, 0);
            }
        }

        let mut newest: Option<NaiveDate> = None;
        let mut submitted_replicates: BTreeSet<String> = BTreeSet::new();
        for file_id in &experiment.files {
            let file: FileRecord =
                serde_json::from_value(self.portal.fetch_object(file_id).await?)
                    .unwrap_or_default();
            if file.file_format != "fastq" {
                continue;
            }
            let status = file.status.as_str();
            if EXCLUDED_FASTQ_STATUSES.contains(&status) {
                continue;
            }
            if let Some(date) = file
                .date_created
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.get(..10).unwrap_or(d), "%Y-%m-%d").ok())
            {
                newest = Some(newest.map_or(date, |current| current.max(date)));
            }
            if let Some(replicate) = &file.replicate {
                submitted_replicates.insert(replicate.clone());
                if let (Some(read_count), Some(reads)) =
                    (file.read_count, replicate_reads.get_mut(replicate))
                {
                    *reads += read_count;
                }
            }
        }

        if replicates.is_empty() || !replicates.is_subset(&submitted_replicates) {
            return Ok(None);
        }

        // read depth floors
        for (replicate, reads) in &replicate_reads {
            let floor = if rfa == MODENCODE_RFA {
                Some(MODENCODE_MIN_DEPTH)
            } else {
                experiment
                    .assay_term_name
                    .as_deref()
                    .and_then(minimum_read_depth)
            };
            if let Some(expected) = floor {
                if *reads < expected {
                    return Ok(Some(Verdict::ShallowReplicate {
                        rfa,
                        replicate: replicate.clone(),
                        reads: *reads,
                        expected,
                    }));
                }
            }
        }

        let accession = experiment.accession.as_deref().unwrap_or("UNKNOWN");
        let page = self.portal.fetch_page(&format!("/{accession}")).await?;
        let audit = page.get("audit").cloned().unwrap_or(Value::Null);
        let failing = truthy(audit.get("ERROR")) || truthy(audit.get("NOT_COMPLIANT"));
        if failing {
            return Ok(Some(Verdict::AuditErrors { rfa }));
        }
        Ok(Some(Verdict::Submitted {
            rfa,
            newest: newest
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }))
    }
}

enum Verdict {
    Submitted {
        rfa: String,
        newest: String,
    },
    ShallowReplicate {
        rfa: String,
        replicate: String,
        reads: u64,
        expected: u64,
    },
    AuditErrors {
        rfa: String,
    },
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_mirrors_audit_payloads() {
        assert!(!truthy(None));
        assert!(!truthy(Some(&Value::Null)));
        assert!(!truthy(Some(&json!([]))));
        assert!(truthy(Some(&json!([{ "category": "missing documents" }]))));
        assert!(!truthy(Some(&json!(""))));
        assert!(truthy(Some(&json!("warn"))));
    }
}
