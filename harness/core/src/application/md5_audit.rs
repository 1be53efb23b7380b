// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Matching-md5sum audit.
//!
//! Files sharing an md5sum are almost always the same upload registered
//! twice. The audit groups settled files by checksum and patches each
//! member's `matching_md5sum` with the other members, so curators see the
//! duplicates without re-hashing anything.

use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use checkfiles_portal::{Md5FileFields, PortalClient};

use crate::application::report;
use crate::domain::experiment::MD5_AUDIT_EXCLUDED_STATUSES;
use crate::infrastructure::report_file::ReportSink;
use crate::infrastructure::slack::{notify_best_effort, upload_report_file, Notifier};

const FIELDS_QUERY: &str = "/search/?type=File&field=external_accession&field=accession&field=uuid&field=status&field=md5sum&field=matching_md5sum&limit=all&format=json";

#[derive(Debug, Default, Clone, Copy)]
pub struct Md5AuditSummary {
    pub files_seen: usize,
    pub groups: usize,
    pub patched: usize,
}

pub struct Md5AuditService {
    portal: Arc<PortalClient>,
    notifier: Arc<dyn Notifier>,
}

impl Md5AuditService {
    pub fn new(portal: Arc<PortalClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self { portal, notifier }
    }

    pub async fn run(
        &self,
        out: &mut ReportSink,
        dry_run: bool,
    ) -> anyhow::Result<Md5AuditSummary> {
        let banner = report::md5_audit_start_banner(self.portal.base_url().as_str(), dry_run);
        out.write_line(&banner)?;
        out.write_line("File uuid\tmd5sum\tMatching md5sum files")?;
        notify_best_effort(self.notifier.as_ref(), &banner).await;

        let graph = self.portal.search_graph(FIELDS_QUERY).await?;
        let files: Vec<Md5FileFields> = graph
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        let mut summary = Md5AuditSummary {
            files_seen: files.len(),
            ..Md5AuditSummary::default()
        };

        let mut accession_to_uuid: HashMap<&str, &str> = HashMap::new();
        for file in &files {
            let Some(uuid) = file.uuid.as_deref() else {
                continue;
            };
            if let Some(accession) = file.accession.as_deref() {
                accession_to_uuid.insert(accession, uuid);
            } else if let Some(external) = file.external_accession.as_deref() {
                accession_to_uuid.insert(external, uuid);
            }
        }

        let mut by_md5: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut recorded: HashMap<&str, Vec<String>> = HashMap::new();
        for file in &files {
            let status = file.status.as_deref().unwrap_or("");
            if MD5_AUDIT_EXCLUDED_STATUSES.contains(&status) {
                continue;
            }
            let Some(uuid) = file.uuid.as_deref() else {
                continue;
            };
            if let Some(md5) = file.md5sum.as_deref() {
                by_md5.entry(md5).or_default().insert(uuid);
            }
            if let Some(matching) = &file.matching_md5sum {
                let mut known: Vec<String> = matching
                    .iter()
                    .filter_map(|entry| resolve_uuid(entry, &accession_to_uuid))
                    .collect();
                known.sort();
                recorded.insert(uuid, known);
            }
        }

        for (md5, uuids) in &by_md5 {
            if uuids.len() < 2 {
                continue;
            }
            summary.groups += 1;
            for uuid in uuids {
                let matching: Vec<String> = uuids
                    .iter()
                    .filter(|other| *other != uuid)
                    .map(|other| (*other).to_owned())
                    .collect();
                let already_known = recorded
                    .get(uuid)
                    .is_some_and(|known| *known == matching);
                if already_known || dry_run {
                    continue;
                }
                match self
                    .portal
                    .patch_item(uuid, &json!({ "matching_md5sum": matching }), None)
                    .await
                {
                    Ok(()) => {
                        summary.patched += 1;
                        out.write_line(&format!("{uuid}\tmd5:{md5}\t{matching:?}"))?;
                    }
                    Err(e) => {
                        warn!(uuid, error = %e, "matching_md5sum patch failed");
                    }
                }
            }
        }

        let banner = report::md5_audit_finish_banner();
        out.write_line(&banner)?;
        notify_best_effort(self.notifier.as_ref(), &banner).await;
        upload_report_file(self.notifier.as_ref(), out.path()).await;
        info!(
            files = summary.files_seen,
            groups = summary.groups,
            patched = summary.patched,
            "md5 audit finished"
        );
        Ok(summary)
    }
}

/// `matching_md5sum` entries arrive as `/files/<token>/` paths; the token
/// is either a uuid already or an accession to resolve.
fn resolve_uuid(entry: &str, accession_to_uuid: &HashMap<&str, &str>) -> Option<String> {
    let token = entry.split('/').nth(2).unwrap_or(entry);
    if token.len() == 36 && token.contains('-') {
        return Some(token.to_owned());
    }
    accession_to_uuid.get(token).map(|uuid| (*uuid).to_owned())
}
