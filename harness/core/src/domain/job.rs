// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Check jobs: one file's trip through the pipeline.
//!
//! A job accumulates keyed errors and outcome fields as the checks run;
//! nothing here talks to the portal or the filesystem. The `content_error`
//! key is special: it aggregates every submitter-visible problem into the
//! single message the portal stores as `content_error_detail`.

use chrono::{SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

use crate::domain::file::FileRecord;

pub const CONTENT_ERROR_KEY: &str = "content_error";

/// Insertion-ordered error map. Assigning an existing key overwrites it,
/// matching how later checks refine earlier findings.
#[derive(Debug, Clone, Default)]
pub struct CheckErrors {
    entries: Vec<(String, String)>,
}

impl CheckErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        let key = key.into();
        let message = message.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = message;
        } else {
            self.entries.push((key, message));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append to the aggregated submitter-facing message.
    pub fn push_content_error(&mut self, message: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == CONTENT_ERROR_KEY) {
            Some(slot) => {
                slot.1.push_str(", ");
                slot.1.push_str(message);
            }
            None => self
                .entries
                .push((CONTENT_ERROR_KEY.to_owned(), message.to_owned())),
        }
    }

    pub fn content_error(&self) -> Option<&str> {
        self.get(CONTENT_ERROR_KEY)
    }
}

impl Serialize for CheckErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Everything a successful (or partially successful) check learns about a
/// file. Fields stay `None` until the corresponding check ran.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5sum: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_md5sum: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate_files_args: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate_files: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bam_validation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_count: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fastq_signature: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_run_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_read_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub crispr_guide_quant: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub crispr_pam: Option<String>,
}

/// One file working its way through a polling cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CheckJob {
    /// Portal `@id` path of the file.
    #[serde(rename = "@id")]
    pub id: String,

    /// UTC timestamp the job was built, ISO 8601 with trailing `Z`. String
    /// form on purpose: it is compared lexicographically against the
    /// upload-credential expiration, which arrives as the same format.
    pub run: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<FileRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    /// Empty string for grandfathered files with no expiration on record.
    pub upload_expiration: String,

    pub errors: CheckErrors,

    #[serde(rename = "result")]
    pub outcome: CheckOutcome,

    /// Transient problem upstream; leave the file alone this cycle.
    pub skip: bool,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub patched: bool,

    /// Set for single-local-file runs; overrides mirror resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_file: Option<PathBuf>,
}

impl CheckJob {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            run: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            item: None,
            etag: None,
            download_url: None,
            upload_expiration: String::new(),
            errors: CheckErrors::new(),
            outcome: CheckOutcome::default(),
            skip: false,
            patched: false,
            local_file: None,
        }
    }

    pub fn accession(&self) -> &str {
        self.item
            .as_ref()
            .map(|i| i.accession_or_unknown())
            .unwrap_or("UNKNOWN")
    }

    /// Credentials not yet expired at job-build time. Grandfathered files
    /// (empty expiration) count as expired.
    pub fn upload_unexpired(&self) -> bool {
        self.run < self.upload_expiration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_existing_key() {
        let mut errors = CheckErrors::new();
        errors.insert("md5sum", "first");
        errors.insert("md5sum", "second");
        assert_eq!(errors.get("md5sum"), Some("second"));
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn content_error_accumulates() {
        let mut errors = CheckErrors::new();
        errors.push_content_error("bad checksum");
        errors.push_content_error("bad gzip");
        assert_eq!(errors.content_error(), Some("bad checksum, bad gzip"));
    }

    #[test]
    fn errors_serialize_in_insertion_order() {
        let mut errors = CheckErrors::new();
        errors.insert("b_key", "1");
        errors.insert("a_key", "2");
        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(json, r#"{"b_key":"1","a_key":"2"}"#);
    }

    #[test]
    fn unexpired_upload_comparison() {
        let mut job = CheckJob::new("/files/ABC123/");
        assert!(!job.upload_unexpired());
        job.upload_expiration = "9999-01-01T00:00:00Z".to_owned();
        assert!(job.upload_unexpired());
        job.upload_expiration = "2000-01-01T00:00:00Z".to_owned();
        assert!(!job.upload_unexpired());
    }

    #[test]
    fn accession_falls_back_to_unknown() {
        let job = CheckJob::new("/files/ABC123/");
        assert_eq!(job.accession(), "UNKNOWN");
    }
}
