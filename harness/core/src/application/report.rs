// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Turning finished jobs into portal patches and report rows.

use serde_json::{json, Map, Value};

use crate::domain::file::PatchStatus;
use crate::domain::job::CheckJob;

/// Characters of `content_error_detail` the portal will index.
const CONTENT_ERROR_DETAIL_LIMIT: usize = 5000;

pub const TAB_REPORT_HEADER: &str =
    "Accession\tLab\tErrors\tAliases\tDownload URL\tUpload Expiration";

/// The PATCH body for a checked job, or `None` when there is nothing the
/// portal should learn from this cycle (skipped jobs, transient errors).
pub fn build_patch(job: &mut CheckJob) -> Option<Value> {
    let mut data = Map::new();

    if job.errors.is_empty() && !job.skip {
        data.insert("status".to_owned(), json!(PatchStatus::InProgress.as_str()));
    } else {
        if let Some(name) = job.errors.get("fastq_format_readname").map(str::to_owned) {
            job.errors.push_content_error(&format!(
                "Fastq file contains read names that don’t follow the Illumina standard naming \
                 schema; for example {name}"
            ));
        }
        if let Some(content_error) = job.errors.content_error() {
            // truncated to stay indexable for very long validator output
            let detail: String = content_error
                .chars()
                .take(CONTENT_ERROR_DETAIL_LIMIT)
                .collect();
            data.insert("status".to_owned(), json!(PatchStatus::ContentError.as_str()));
            data.insert(
                "content_error_detail".to_owned(),
                json!(detail.trim().to_owned()),
            );
        }
        if job.errors.contains_key("file_not_found") {
            data.clear();
            data.insert("status".to_owned(), json!(PatchStatus::UploadFailed.as_str()));
        }
    }

    if let Some(file_size) = job.outcome.file_size {
        data.insert("file_size".to_owned(), json!(file_size));
    }
    if let Some(read_count) = job.outcome.read_count {
        data.insert("read_count".to_owned(), json!(read_count));
    }
    if let Some(signatures) = &job.outcome.fastq_signature {
        if !signatures.is_empty() {
            data.insert("fastq_signature".to_owned(), json!(signatures));
        }
    }
    if let Some(content_md5sum) = &job.outcome.content_md5sum {
        data.insert("content_md5sum".to_owned(), json!(content_md5sum));
    }
    if let Some(mapped_run_type) = &job.outcome.mapped_run_type {
        data.insert("mapped_run_type".to_owned(), json!(mapped_run_type));
    }
    if let Some(mapped_read_length) = job.outcome.mapped_read_length {
        data.insert("mapped_read_length".to_owned(), json!(mapped_read_length));
    }

    if data.is_empty() {
        None
    } else {
        Some(Value::Object(data))
    }
}

/// One tab row per job: accession, lab, errors, aliases, download URL,
/// upload expiration.
pub fn tab_row(job: &CheckJob) -> String {
    let lab = job
        .item
        .as_ref()
        .and_then(|item| item.lab.as_deref())
        .unwrap_or("UNKNOWN");
    let aliases = job
        .item
        .as_ref()
        .filter(|item| !item.aliases.is_empty())
        .map(|item| serde_json::to_string(&item.aliases).unwrap_or_default())
        .unwrap_or_else(|| r#"["n/a"]"#.to_owned());
    let errors = serde_json::to_string(&job.errors).unwrap_or_default();
    [
        job.accession(),
        lab,
        &errors,
        &aliases,
        job.download_url.as_deref().unwrap_or(""),
        &job.upload_expiration,
    ]
    .join("\t")
}

pub fn json_row(job: &CheckJob) -> String {
    serde_json::to_string(job).unwrap_or_default()
}

fn local_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn host() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_default()
}

fn dry_run_marker(dry_run: bool) -> &'static str {
    if dry_run {
        "-- Dry Run"
    } else {
        ""
    }
}

pub fn check_start_banner(url: &str, query: &str, workers: usize, dry_run: bool) -> String {
    format!(
        "STARTING Checkfiles version {} ({}) ({}): with {} workers {} on {} at {}",
        env!("CARGO_PKG_VERSION"),
        url,
        query,
        workers,
        dry_run_marker(dry_run),
        host(),
        local_now(),
    )
}

pub fn check_finish_banner() -> String {
    format!("FINISHED Checkfiles at {}", local_now())
}

pub fn md5_audit_start_banner(url: &str, dry_run: bool) -> String {
    format!(
        "STARTING matching md5sum files detection, version {} ({}) ({}): {} at {}",
        env!("CARGO_PKG_VERSION"),
        url,
        dry_run_marker(dry_run),
        host(),
        local_now(),
    )
}

pub fn md5_audit_finish_banner() -> String {
    format!("FINISHED matching md5sum files detection at {}", local_now())
}

pub fn experiment_start_banner(url: &str, query: &str, dry_run: bool) -> String {
    format!(
        "STARTING Checkexperiments version {} ({}) ({}): {} on {} at {}",
        env!("CARGO_PKG_VERSION"),
        url,
        query,
        dry_run_marker(dry_run),
        host(),
        local_now(),
    )
}

pub fn experiment_finish_banner() -> String {
    format!("FINISHED Checkexperiments at {}", local_now())
}
