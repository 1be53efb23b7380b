// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A file object as returned by the portal's `frame=edit` view.
///
/// Only the fields the check pipeline reads are typed; the edit frame
/// carries many more, which deserialization ignores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub accession: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_accession: Option<String>,

    #[serde(default)]
    pub file_format: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_format_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub genome_annotation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5sum: Option<String>,

    #[serde(default)]
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flowcell_details: Vec<FlowcellDetail>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicate: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_from: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,

    #[serde(default)]
    pub no_file_available: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_name_details: Option<ReadNameDetails>,
}

impl FileRecord {
    /// Accession for report rows; external accession as fallback.
    pub fn accession_or_unknown(&self) -> &str {
        self.accession
            .as_deref()
            .or(self.external_accession.as_deref())
            .unwrap_or("UNKNOWN")
    }
}

/// One lane entry from `flowcell_details` metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowcellDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flowcell: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

/// Submitter-declared word positions inside a read name, used when the
/// platform does not follow one of the recognized naming grammars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadNameDetails {
    pub flowcell_id_location: usize,
    pub lane_id_location: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_number_location: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_location: Option<usize>,
}

/// Upload credentials attached to a file still in `uploading` state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,

    /// Expiration timestamp, absent for grandfathered files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

/// An item plus the etag the portal served it under.
#[derive(Debug, Clone)]
pub struct EditFrame {
    pub item: Value,
    pub etag: String,
}

/// Field projection used by the matching-md5sum audit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Md5FileFields {
    #[serde(default)]
    pub accession: Option<String>,

    #[serde(default)]
    pub external_accession: Option<String>,

    #[serde(default)]
    pub uuid: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub md5sum: Option<String>,

    #[serde(default)]
    pub matching_md5sum: Option<Vec<String>>,
}

/// An experiment object (`frame=object`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExperimentRecord {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(default)]
    pub accession: Option<String>,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub assay_term_name: Option<String>,

    #[serde(default)]
    pub award: Option<String>,

    #[serde(default)]
    pub replicates: Vec<String>,

    #[serde(default)]
    pub files: Vec<String>,
}

/// A replicate object, as far as the experiment audit cares.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplicateRecord {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(default)]
    pub status: String,
}

/// An award object; `rfa` names the funding phase in report rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwardRecord {
    #[serde(default)]
    pub rfa: Option<String>,
}

/// Search response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(rename = "@graph", default)]
    pub graph: Vec<Value>,
}

/// `@@upload` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(rename = "@graph", default)]
    pub graph: Vec<UploadGraphEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadGraphEntry {
    #[serde(default)]
    pub upload_credentials: Option<UploadCredentials>,
}
