// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The per-file check pipeline.
//!
//! One [`CheckJob`] at a time: resolve the mirrored path, stat, md5,
//! gzip policy, content md5 with conflict lookup, format validation via
//! the external tools, fastq content inspection, bam mapped stats, and
//! finally the etag-guarded result patch. Every failure lands in the
//! job's error map; nothing here aborts a batch.

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use checkfiles_portal::{PortalClient, PortalError};

use crate::application::report;
use crate::domain::config::CheckSettings;
use crate::domain::fastq::{
    check_read_lengths, flowcell_details_intersect, has_umi_barcode, FastqScan, ReadLengthCheck,
};
use crate::domain::file::{
    accession_from_path, expects_gzip, is_long_read_platform, FileRecord, FlowcellDetail,
    PLATFORM_ULTIMA, STATUS_UPLOADING,
};
use crate::domain::job::{CheckErrors, CheckJob, CheckOutcome};
use crate::domain::validator::{
    is_annotation_level_bam, plan_format_validation, FormatValidation,
};
use crate::infrastructure::digest;
use crate::infrastructure::tools::ToolRunner;

/// Where this run's jobs come from.
#[derive(Debug, Clone)]
pub enum JobIntake {
    /// Portal search query fragment, e.g. `status=uploading`.
    Query(String),
    /// File with one accession per line.
    AccessionList(PathBuf),
    /// A single local file; its accession is derived from the file name.
    LocalFile(PathBuf),
}

pub struct CheckService {
    portal: Arc<PortalClient>,
    settings: CheckSettings,
    tools: ToolRunner,
}

impl CheckService {
    pub fn new(portal: Arc<PortalClient>, settings: CheckSettings) -> Self {
        let tools = ToolRunner::new(&settings.validate_files_bin, &settings.samtools_bin);
        Self {
            portal,
            settings,
            tools,
        }
    }

    /// Build the jobs for one cycle.
    pub async fn build_jobs(
        &self,
        intake: &JobIntake,
        include_unexpired_upload: bool,
    ) -> Result<Vec<CheckJob>, PortalError> {
        let (ids, local_file) = match intake {
            JobIntake::Query(query) => (self.portal.search_file_ids(query).await?, None),
            JobIntake::AccessionList(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    PortalError::Url(format!("accession list {}: {e}", path.display()))
                })?;
                let mut ids = Vec::new();
                for accession in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    ids.extend(
                        self.portal
                            .search_file_ids(&format!("accession={accession}"))
                            .await?,
                    );
                }
                (ids, None)
            }
            JobIntake::LocalFile(path) => {
                let accession = accession_from_path(&path.to_string_lossy()).to_owned();
                (
                    self.portal
                        .search_file_ids(&format!("accession={accession}"))
                        .await?,
                    Some(path.clone()),
                )
            }
        };

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            jobs.push(
                self.build_job(&id, local_file.as_deref(), include_unexpired_upload)
                    .await,
            );
        }
        Ok(jobs)
    }

    async fn build_job(
        &self,
        id: &str,
        local_file: Option<&Path>,
        include_unexpired_upload: bool,
    ) -> CheckJob {
        let mut job = CheckJob::new(id);

        let mut credentials_ok = false;
        match self.portal.fetch_upload_credentials(id).await {
            Ok(credentials) => {
                credentials_ok = true;
                if let Some(credentials) = credentials {
                    job.upload_expiration = credentials.expiration.unwrap_or_default();
                    job.download_url = credentials.upload_url;
                }
            }
            Err(e) => {
                job.errors.insert("get_upload_url_request", e.to_string());
            }
        }

        match self.portal.fetch_edit_frame(id).await {
            Ok(frame) => match serde_json::from_value::<FileRecord>(frame.item) {
                Ok(item) => {
                    // the mirrored object is the source of truth for the
                    // download location when present
                    if let Some(s3_uri) = &item.s3_uri {
                        job.download_url = Some(s3_uri.clone());
                    }
                    job.item = Some(item);
                    job.etag = Some(frame.etag);
                }
                Err(e) => {
                    job.errors.insert("get_edit_request", e.to_string());
                }
            },
            Err(e) => {
                job.errors.insert("get_edit_request", e.to_string());
            }
        }

        if credentials_ok && job.item.is_some() && job.download_url.is_none() {
            job.errors
                .insert("download_url_missing", "download url is missing");
        }

        // Only check files that will not be changed during the check.
        if job.upload_unexpired() && !include_unexpired_upload {
            job.errors.insert(
                "unexpired_credentials",
                "File status have not been changed, the file check was skipped due to file's \
                 unexpired upload credentials",
            );
        }

        if !job.errors.is_empty() {
            // Probably a transient error
            job.skip = true;
        }
        if let Some(path) = local_file {
            job.local_file = Some(path.to_owned());
        }
        job
    }

    /// Run every check on one job, mutating its errors and outcome.
    pub async fn check(&self, job: &mut CheckJob) {
        if job.skip {
            return;
        }
        let Some(item) = job.item.clone() else {
            return;
        };
        debug!(accession = job.accession(), "checking file");

        let local_path = match &job.local_file {
            Some(path) => path.clone(),
            None => {
                if item.no_file_available {
                    return;
                }
                let Some(download_url) = &job.download_url else {
                    return;
                };
                self.settings
                    .mirror
                    .join(download_url.trim_start_matches("s3://"))
            }
        };

        match tokio::fs::metadata(&local_path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if job.run > job.upload_expiration {
                    job.errors
                        .insert("file_not_found", "File has not been uploaded yet.");
                } else {
                    job.errors.insert(
                        "file_not_found_unexpired_credentials",
                        "File has not been uploaded yet, but the credentials are not expired, \
                         so the status was not changed.",
                    );
                }
                job.skip = true;
                return;
            }
            // mirror mount hiccups surface as other I/O errors
            Err(_) => {
                job.errors.insert(
                    "file_check_skipped_due_to_mirror_connectivity",
                    "File check was skipped due to temporary object-store connectivity issues",
                );
                job.skip = true;
                return;
            }
            Ok(metadata) => {
                job.outcome.file_size = Some(metadata.len());
                if let Ok(modified) = metadata.modified() {
                    let modified: chrono::DateTime<chrono::Utc> = modified.into();
                    job.outcome.last_modified =
                        Some(modified.to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
                }
            }
        }

        self.md5_check(&item, &local_path, &mut job.errors, &mut job.outcome)
            .await;

        let gzipped = {
            let path = local_path.clone();
            match run_blocking(move || digest::is_gzipped(&path)).await {
                Ok(Ok(gzipped)) => gzipped,
                _ => return,
            }
        };

        let mut modified_bed: Option<PathBuf> = None;
        if !expects_gzip(&item.file_format) {
            if gzipped {
                job.errors.insert("gzip", "Expected un-gzipped file");
                job.errors.push_content_error("Expected un-gzipped file");
            }
        } else if !gzipped {
            job.errors.insert("gzip", "Expected gzipped file");
            job.errors.push_content_error("Expected gzipped file");
        } else {
            self.content_md5_check(&item, &local_path, &mut job.errors, &mut job.outcome)
                .await;
            if item.file_format == "bed" {
                modified_bed = self
                    .prepare_modified_bed(&item, &local_path, &mut job.errors)
                    .await;
            }
        }

        let validation_path = modified_bed.clone().unwrap_or_else(|| local_path.clone());
        self.format_validation(&item, &validation_path, &mut job.errors, &mut job.outcome)
            .await;
        if let Some(path) = modified_bed {
            if std::fs::remove_file(&path).is_err() {
                job.errors.insert(
                    "file_remove_error",
                    format!("OS could not remove the file {}", path.display()),
                );
            }
        }

        if item.file_format == "fastq" && !job.errors.contains_key("validateFiles") {
            self.fastq_checks(&job.id, &item, &local_path, &mut job.errors, &mut job.outcome)
                .await;
        }

        if item.file_format == "tsv"
            && item.output_type.as_deref() == Some("guide quantifications")
            && item.file_format_type.as_deref() == Some("guide quantifications")
            && item.assembly.as_deref() == Some("GRCh38")
        {
            self.crispr_checks(&local_path, &mut job.errors, &mut job.outcome)
                .await;
        }

        if item.file_format == "bam"
            && !job.errors.contains_key("validateFiles")
            && !item
                .output_type
                .as_deref()
                .is_some_and(|t| t.contains("subreads"))
        {
            self.bam_mapped_stats(&job.id, &local_path, &mut job.errors, &mut job.outcome)
                .await;
        }

        if item.status != STATUS_UPLOADING {
            job.errors.insert(
                "status_check",
                format!("status '{}' is not '{STATUS_UPLOADING}'", item.status),
            );
        }
        if !job.errors.is_empty() {
            let snapshot = serde_json::to_string(&job.outcome).unwrap_or_default();
            job.errors.insert(
                "gathered_information",
                format!("Gathered information about the file was: {snapshot}."),
            );
        }
    }

    /// PATCH the job's findings back, guarded by the intake etag.
    pub async fn patch(&self, job: &mut CheckJob) {
        let Some(data) = report::build_patch(job) else {
            return;
        };
        let Some(etag) = job.etag.clone() else {
            return;
        };
        match self.portal.fetch_edit_frame(&job.id).await {
            Err(e) => {
                job.errors.insert(
                    "lookup_for_etag",
                    format!(
                        "Network error occured, while looking for etag of the file object to \
                         be patched on the portal. {e}"
                    ),
                );
            }
            Ok(frame) if frame.etag == etag => {
                match self.portal.patch_item(&job.id, &data, Some(&etag)).await {
                    Ok(()) => job.patched = true,
                    Err(e) => {
                        job.errors.insert("patch_file_request", e.to_string());
                    }
                }
            }
            Ok(frame) => {
                let was = job
                    .item
                    .as_ref()
                    .map(|item| item.status.as_str())
                    .unwrap_or("UNKNOWN");
                let now = frame
                    .item
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("UNKNOWN");
                let message = format!(
                    "Original etag was {etag}, but the current etag is {}. File {} was {was} \
                     and now is {now}.",
                    frame.etag,
                    job.accession(),
                );
                job.errors.insert("etag_does_not_match", message);
            }
        }
    }

    async fn md5_check(
        &self,
        item: &FileRecord,
        path: &Path,
        errors: &mut CheckErrors,
        outcome: &mut CheckOutcome,
    ) {
        let digest = {
            let path = path.to_owned();
            run_blocking(move || digest::md5_file(&path)).await
        };
        match digest {
            Ok(Ok(digest)) => {
                outcome.md5sum = Some(digest.clone());
                if let Some(expected) = &item.md5sum {
                    if *expected != digest {
                        errors.insert(
                            "md5sum",
                            format!("checked {digest} does not match item {expected}"),
                        );
                        errors.push_content_error(&format!(
                            "File metadata-specified md5sum {expected} does not match the \
                             calculated md5sum {digest}"
                        ));
                    }
                }
            }
            Ok(Err(e)) => {
                errors.insert("md5sum", e.to_string());
            }
            Err(e) => {
                errors.insert("md5sum", e);
            }
        }
    }

    async fn content_md5_check(
        &self,
        item: &FileRecord,
        path: &Path,
        errors: &mut CheckErrors,
        outcome: &mut CheckOutcome,
    ) {
        let digest = {
            let path = path.to_owned();
            run_blocking(move || digest::content_md5_of_gzip(&path)).await
        };
        let digest = match digest {
            Ok(Ok(digest)) => digest,
            Ok(Err(e)) => {
                errors.insert("content_md5sum", e.to_string());
                return;
            }
            Err(e) => {
                errors.insert("content_md5sum", e);
                return;
            }
        };
        outcome.content_md5sum = Some(digest.clone());

        match self.portal.search_content_md5(&digest).await {
            Err(e) => {
                errors.insert(
                    "lookup_for_content_md5sum",
                    format!(
                        "Network error occured, while looking for content md5sum conflict on \
                         the portal. {e}"
                    ),
                );
            }
            Ok(graph) => {
                let mut conflicts = Vec::new();
                for entry in &graph {
                    let entry_accession = entry.get("accession").and_then(Value::as_str);
                    match (entry_accession, item.accession.as_deref()) {
                        (Some(other), Some(own)) if other != own => {
                            conflicts.push(format!("{digest} in file {other} "));
                        }
                        (Some(other), None) => {
                            conflicts.push(format!("{digest} in file {other} "));
                        }
                        (None, None) => {
                            conflicts.push(format!("{digest} "));
                        }
                        _ => {}
                    }
                }
                if !conflicts.is_empty() {
                    errors.insert("content_md5sum", format!("{conflicts:?}"));
                    errors.push_content_error(&format!(
                        "File content md5sum conflicts with content md5sum of existing \
                         file(s) {}",
                        conflicts.join(", ")
                    ));
                }
            }
        }
    }

    /// Comment lines make validateFiles reject an otherwise fine bed, so
    /// they are stripped into a scratch copy the validator sees instead.
    async fn prepare_modified_bed(
        &self,
        item: &FileRecord,
        path: &Path,
        errors: &mut CheckErrors,
    ) -> Option<PathBuf> {
        let comments = {
            let path = path.to_owned();
            run_blocking(move || digest::count_bed_comments(&path)).await
        };
        match comments {
            Ok(Ok(0)) => None,
            Ok(Ok(_)) => {
                let dest = std::env::temp_dir()
                    .join(format!("{}_modified.bed", item.accession_or_unknown()));
                let strip = {
                    let src = path.to_owned();
                    let dest = dest.clone();
                    run_blocking(move || digest::strip_bed_comments(&src, &dest)).await
                };
                match strip {
                    Ok(Ok(())) => Some(dest),
                    Ok(Err(e)) => {
                        errors.insert("bed_comments_remove_failure", e.to_string());
                        None
                    }
                    Err(e) => {
                        errors.insert("bed_comments_remove_failure", e);
                        None
                    }
                }
            }
            Ok(Err(e)) => {
                errors.insert("bed_comment_scan", e.to_string());
                None
            }
            Err(e) => {
                errors.insert("bed_comment_scan", e);
                None
            }
        }
    }

    async fn format_validation(
        &self,
        item: &FileRecord,
        path: &Path,
        errors: &mut CheckErrors,
        outcome: &mut CheckOutcome,
    ) {
        let plan = plan_format_validation(item, &self.settings.enc_valdata);
        if plan == FormatValidation::Subreads {
            return;
        }

        // quickcheck runs for every bam, except annotation-level
        // alignments whose metadata is too incomplete to validate at all
        let annotation_level = item
            .output_type
            .as_deref()
            .is_some_and(is_annotation_level_bam);
        let run_quickcheck = item.file_format == "bam"
            && (matches!(plan, FormatValidation::Run(_)) || !annotation_level);
        if run_quickcheck {
            match self.tools.samtools_quickcheck(path).await {
                Ok(output) => outcome.bam_validation = Some(output),
                Err(e) => {
                    let output = e.output();
                    errors.insert("bam_validation", output.clone());
                    errors.push_content_error(&format!(
                        "File failed bam validation (samtools quickcheck). {output}"
                    ));
                }
            }
        }

        match plan {
            FormatValidation::Unvalidated | FormatValidation::Subreads => {}
            FormatValidation::MissingMetadata(fields) => {
                for field in fields {
                    errors.insert(field.key, format!("missing {}", field.key));
                    errors.push_content_error(field.content_error);
                }
            }
            FormatValidation::Run(args) => {
                outcome.validate_files_args = Some(args.join(" "));
                match self.tools.validate_files(&args, path).await {
                    Ok(output) => outcome.validate_files = Some(output),
                    Err(e) => {
                        let output = e.output();
                        errors.insert("validateFiles", output.clone());
                        errors.push_content_error(&format!(
                            "File failed file format specific validation (encValData) {output}"
                        ));
                    }
                }
            }
        }
    }

    async fn fastq_checks(
        &self,
        job_id: &str,
        item: &FileRecord,
        path: &Path,
        errors: &mut CheckErrors,
        outcome: &mut CheckOutcome,
    ) {
        let platform_uuid = self.platform_uuid_for(job_id, errors).await;
        let details = self.read_name_details_for(job_id, errors).await;
        let parse_names = platform_uuid.as_deref() != Some(PLATFORM_ULTIMA);

        let scan = {
            let path = path.to_owned();
            run_blocking(move || -> std::io::Result<FastqScan> {
                let mut scan = FastqScan::new();
                let reader = digest::gzip_reader(&path)?;
                scan.consume(reader, parse_names, details.as_ref())?;
                Ok(scan)
            })
            .await
        };
        let scan = match scan {
            Ok(Ok(scan)) => scan,
            _ => {
                errors.insert(
                    "unzipped_fastq_streaming",
                    "Error occured, while streaming unzipped fastq.",
                );
                return;
            }
        };

        if scan.bad_encoding {
            errors.insert(
                "readname_encoding",
                "Error occured, while decoding the readname string.",
            );
        }
        if let Some(name) = &scan.unrecognized_name {
            errors.insert("fastq_format_readname", name.clone());
        }
        outcome.read_count = Some(scan.read_count);

        let platform = platform_uuid.as_deref();
        if platform != Some(PLATFORM_ULTIMA) && scan.read_numbers.len() > 1 {
            let numbers: Vec<&str> = scan.read_numbers.iter().map(String::as_str).collect();
            errors.insert(
                "inconsistent_read_numbers",
                format!("fastq file contains mixed read numbers {}.", numbers.join(", ")),
            );
            errors.push_content_error("Fastq file contains a mixture of read1 and read2 sequences");
        }

        if !platform.is_some_and(is_long_read_platform) {
            match item.read_length {
                Some(read_length) if read_length > 2 => {
                    if let ReadLengthCheck::Mismatch {
                        error,
                        content_error,
                    } = check_read_lengths(&scan, read_length, 0.9)
                    {
                        errors.insert("read_length", error);
                        errors.push_content_error(&content_error);
                    }
                }
                _ => {
                    let observed: Vec<String> = scan
                        .read_length_pairs()
                        .iter()
                        .map(|(length, count)| format!("({length}, {count})"))
                        .collect();
                    let observed = observed.join(", ");
                    errors.insert(
                        "read_length",
                        format!(
                            "no specified read length in the uploaded fastq file, while read \
                             length(s) found in the file were {observed}. "
                        ),
                    );
                    errors.push_content_error(&format!(
                        "Fastq file metadata lacks read length information, but the file \
                         contains read length(s) {observed}"
                    ));
                }
            }
        }

        if platform == Some(PLATFORM_ULTIMA) {
            return;
        }
        let signatures = scan.signatures_for_comparison(has_umi_barcode(&item.flowcell_details));
        outcome.fastq_signature = Some(signatures.iter().cloned().collect());
        self.signature_conflicts(item, &signatures, errors).await;
    }

    async fn signature_conflicts(
        &self,
        item: &FileRecord,
        signatures: &BTreeSet<String>,
        errors: &mut CheckErrors,
    ) {
        let mut conflicts = Vec::new();
        for signature in signatures {
            if signature.ends_with("mixed:") {
                continue;
            }
            let graph = match self.portal.search_fastq_signature(signature).await {
                Ok(graph) => graph,
                Err(e) => {
                    errors.insert(
                        "lookup_for_fastq_signature",
                        format!(
                            "Network error occured, while looking for fastq signature \
                             conflict on the portal. {e}"
                        ),
                    );
                    continue;
                }
            };
            for entry in &graph {
                // a barcode-less signature hit only counts when the
                // metadata flowcell details actually overlap
                if signature.ends_with("::") {
                    let entry_details: Vec<FlowcellDetail> = entry
                        .get("flowcell_details")
                        .and_then(|v| serde_json::from_value(v.clone()).ok())
                        .unwrap_or_default();
                    if entry_details.is_empty()
                        || item.flowcell_details.is_empty()
                        || !flowcell_details_intersect(&entry_details, &item.flowcell_details)
                    {
                        continue;
                    }
                }
                let entry_accession = entry.get("accession").and_then(Value::as_str);
                match (entry_accession, item.accession.as_deref()) {
                    (Some(other), Some(own)) if other != own => {
                        conflicts.push(format!("{signature} in file {other} "));
                    }
                    (Some(other), None) => {
                        conflicts.push(format!("{signature} in file {other} "));
                    }
                    (None, None) => {
                        conflicts.push(format!("{signature} file on the portal."));
                    }
                    _ => {}
                }
            }
        }
        if !conflicts.is_empty() {
            let message = format!(
                "Fastq file contains read name signature that conflict with signature of \
                 existing file(s): {}",
                conflicts.join(", ")
            );
            errors.insert("not_unique_flowcell_details", message.clone());
            errors.push_content_error(&message);
        }
    }

    async fn platform_uuid_for(&self, id: &str, errors: &mut CheckErrors) -> Option<String> {
        let object = match self.portal.fetch_object(id).await {
            Ok(object) => object,
            Err(e) => {
                errors.insert(
                    "lookup_for_platform",
                    format!(
                        "Network error occured, while looking for platform on the portal. {e}"
                    ),
                );
                return None;
            }
        };
        let platform_id = object.get("platform").and_then(Value::as_str)?.to_owned();
        match self.portal.fetch_object(&platform_id).await {
            Ok(platform) => platform
                .get("uuid")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .or(Some(platform_id)),
            Err(e) => {
                errors.insert(
                    "lookup_for_platform",
                    format!(
                        "Network error occured, while looking for platform on the portal. {e}"
                    ),
                );
                None
            }
        }
    }

    async fn read_name_details_for(
        &self,
        id: &str,
        errors: &mut CheckErrors,
    ) -> Option<crate::domain::file::ReadNameDetails> {
        match self.portal.fetch_object(id).await {
            Ok(object) => object
                .get("read_name_details")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            Err(e) => {
                errors.insert(
                    "lookup_for_read_name_details",
                    format!(
                        "Network error occured, while looking for file read_name details on \
                         the portal. {e}"
                    ),
                );
                None
            }
        }
    }

    /// Platform UUIDs of the fastq ancestry of a file, walking the
    /// `derived_from` closure.
    async fn platforms_from_ancestry(
        &self,
        id: &str,
        errors: &mut CheckErrors,
    ) -> BTreeSet<String> {
        let root = match self.portal.fetch_object(id).await {
            Ok(object) => object
                .get("@id")
                .and_then(Value::as_str)
                .unwrap_or(id)
                .to_owned(),
            Err(e) => {
                errors.insert(
                    "lookup_for_derived_from",
                    format!(
                        "Network error occured, while looking for derived_from on the \
                         portal. {e}"
                    ),
                );
                return BTreeSet::new();
            }
        };

        let mut closure: BTreeSet<String> = BTreeSet::new();
        let mut remaining: BTreeSet<String> = BTreeSet::from([root]);
        while !remaining.is_empty() {
            closure.extend(remaining.iter().cloned());
            let mut next = BTreeSet::new();
            for file in &remaining {
                match self.portal.fetch_object(file).await {
                    Ok(object) => {
                        if let Some(parents) = object.get("derived_from").and_then(Value::as_array)
                        {
                            next.extend(
                                parents
                                    .iter()
                                    .filter_map(Value::as_str)
                                    .map(str::to_owned),
                            );
                        }
                    }
                    Err(e) => {
                        errors.insert(
                            "lookup_for_file_derived_from",
                            format!(
                                "Network error occured, while looking for derived_from on \
                                 the portal. {e}"
                            ),
                        );
                    }
                }
            }
            remaining = next.difference(&closure).cloned().collect();
        }

        let mut platforms = BTreeSet::new();
        for file in &closure {
            match self.portal.fetch_object(file).await {
                Ok(object) => {
                    if object.get("file_format").and_then(Value::as_str) == Some("fastq") {
                        if let Some(uuid) = self.platform_uuid_for(file, errors).await {
                            platforms.insert(uuid);
                        }
                    }
                }
                Err(e) => {
                    errors.insert(
                        "lookup_for_file",
                        format!(
                            "Network error occured, while looking for file_format on the \
                             portal. {e}"
                        ),
                    );
                }
            }
        }
        platforms
    }

    async fn bam_mapped_stats(
        &self,
        job_id: &str,
        path: &Path,
        errors: &mut CheckErrors,
        outcome: &mut CheckOutcome,
    ) {
        let platforms = self.platforms_from_ancestry(job_id, errors).await;
        if platforms.is_empty() {
            return;
        }
        if platforms.iter().any(|uuid| is_long_read_platform(uuid)) {
            return;
        }

        match self.tools.samtools_stats(path).await {
            Err(e) => {
                warn!(error = %e, "samtools stats failed");
                let message = format!("Failed to extract information from {}", path.display());
                errors.insert("samtools_stats_extraction", message.clone());
                errors.push_content_error(&format!(
                    "File failed samtools stats extraction {message}"
                ));
            }
            Ok(stats) => {
                let run_type = mapped_run_type(&stats);
                let read_length = mapped_read_length(&stats);
                match (run_type, read_length) {
                    (Some(run_type), Some(read_length)) => {
                        outcome.mapped_run_type = Some(run_type);
                        outcome.mapped_read_length = Some(read_length);
                    }
                    _ => {
                        let message = format!(
                            "Failed to extract mapped read length and/or mapped run type \
                             from {}",
                            path.display()
                        );
                        errors.insert("missing_mapped_properties", message.clone());
                        errors.push_content_error(&format!(
                            "File failed samtools stats extraction. {message}"
                        ));
                    }
                }
            }
        }
    }

    async fn crispr_checks(
        &self,
        path: &Path,
        errors: &mut CheckErrors,
        outcome: &mut CheckOutcome,
    ) {
        let crispr = &self.settings.crispr;
        let guide = self
            .tools
            .run_script(
                &crispr.python_bin,
                [
                    crispr.guide_script.as_os_str(),
                    crispr.guide_format.as_os_str(),
                    path.as_os_str(),
                ],
            )
            .await;
        let output = match guide {
            Ok(output) => output,
            Err(_) => {
                errors.insert(
                    "crispr_guide_info_extraction",
                    format!("Failed to extract information from {}", path.display()),
                );
                return;
            }
        };

        let mut check_pam = false;
        for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.contains("passed") {
                check_pam = true;
                outcome.crispr_guide_quant = Some(line.to_owned());
            } else {
                errors.insert("crispr_guide_quant_validation", line);
                errors.push_content_error(&format!(
                    "File failed CRISPR guide quantification format validation \
                     (check_guide_quant_format.py). {line}"
                ));
            }
        }
        if !check_pam {
            return;
        }

        match self
            .tools
            .run_script(
                &crispr.python_bin,
                [
                    crispr.pam_script.as_os_str(),
                    path.as_os_str(),
                    crispr.genome_reference.as_os_str(),
                ],
            )
            .await
        {
            Err(_) => {
                errors.insert(
                    "crispr_pam_info_extraction",
                    format!("Failed to extract information from {}", path.display()),
                );
            }
            Ok(output) => {
                if let Some(line) = output.lines().nth(3).map(str::trim) {
                    if line.contains(
                        "More than 80% of the PAMs are NGG. The coordinates are likely to be \
                         correct",
                    ) {
                        outcome.crispr_pam = Some(line.to_owned());
                    } else {
                        errors.insert("crispr_pam_validation", line);
                        errors.push_content_error(&format!(
                            "File failed CRISPR PAM validation (check_PAM.py). {line}"
                        ));
                    }
                }
            }
        }
    }
}

/// `samtools stats` SN section: paired-ended iff any reads are paired.
fn mapped_run_type(stats: &str) -> Option<String> {
    for line in stats.lines() {
        if line.starts_with("SN") && line.contains("reads paired") {
            let fields: Vec<&str> = line.split('\t').collect();
            let paired: u64 = fields.get(2)?.trim().parse().ok()?;
            return Some(
                if paired > 0 {
                    "paired-ended"
                } else {
                    "single-ended"
                }
                .to_owned(),
            );
        }
    }
    None
}

/// Modal read length from the RL histogram.
fn mapped_read_length(stats: &str) -> Option<u64> {
    let mut best: Option<(u64, u64)> = None;
    for line in stats.lines() {
        let Some(rest) = line.strip_prefix("RL\t") else {
            continue;
        };
        let mut fields = rest.split('\t');
        let (Some(length), Some(count)) = (fields.next(), fields.next()) else {
            continue;
        };
        let (Ok(length), Ok(count)) = (length.trim().parse::<u64>(), count.trim().parse::<u64>())
        else {
            continue;
        };
        if best.is_none_or(|(best_count, _)| count > best_count) {
            best = Some((count, length));
        }
    }
    best.map(|(_, length)| length)
}

async fn run_blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS: &str = "\
SN\traw total sequences:\t2000\t# excluding supplementary and secondary reads
SN\treads paired:\t2000\t# paired-end technology bit set
RL\t36\t120
RL\t100\t1880
";

    #[test]
    fn run_type_from_paired_count() {
        assert_eq!(mapped_run_type(STATS).as_deref(), Some("paired-ended"));
        let single = "SN\treads paired:\t0\n";
        assert_eq!(mapped_run_type(single).as_deref(), Some("single-ended"));
        assert_eq!(mapped_run_type("FF\tnothing\n"), None);
    }

    #[test]
    fn read_length_is_modal() {
        assert_eq!(mapped_read_length(STATS), Some(100));
        assert_eq!(mapped_read_length("SN\treads paired:\t1\n"), None);
    }

    #[test]
    fn malformed_rl_lines_are_ignored() {
        let stats = "RL\tnot-a-number\t5\nRL\t72\t9\n";
        assert_eq!(mapped_read_length(stats), Some(72));
    }
}
