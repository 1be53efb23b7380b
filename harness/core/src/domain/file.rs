// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! File-level policies keyed off portal metadata.

pub use checkfiles_portal::{FileRecord, FlowcellDetail, ReadNameDetails};

/// Item status a file must hold to be checked at all.
pub const STATUS_UPLOADING: &str = "uploading";

/// Statuses the portal moves a file into as a result of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStatus {
    InProgress,
    ContentError,
    UploadFailed,
}

impl PatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchStatus::InProgress => "in progress",
            PatchStatus::ContentError => "content error",
            PatchStatus::UploadFailed => "upload failed",
        }
    }
}

/// Formats submitters must gzip before upload; everything else must arrive
/// uncompressed. bam is the historical oddity in this list: submitters gzip
/// the already-compressed container.
const GZIP_TYPES: &[&str] = &[
    "CEL", "bam", "bed", "bedpe", "csfasta", "csqual", "fasta", "fastq", "gff", "gtf", "tagAlign",
    "tar", "txt", "sam", "wig", "vcf", "pairs",
];

pub fn expects_gzip(file_format: &str) -> bool {
    GZIP_TYPES.contains(&file_format)
}

/// Platform UUIDs whose reads are excluded from read-length and mapped-stat
/// checks: PacBio, Nanopore, and Ultima instruments with free-form read
/// lengths.
pub const LONG_READ_PLATFORMS: &[&str] = &[
    "ced61406-dcc6-43c4-bddd-4c977cc676e8",
    "c7564b38-ab4f-4c42-a401-3de48689a998",
    "e2be5728-5744-4da4-8881-cb9526d0389e",
    "7cc06b8c-5535-4a77-b719-4c23644e767d",
    "8f1a9a8c-3392-4032-92a8-5d196c9d7810",
    "6c275b37-018d-4bf8-85f6-6e3b830524a9",
    "6ce511d5-eeb3-41fc-bea7-8c38301e88c1",
    PLATFORM_ULTIMA,
];

/// Ultima reads carry no usable name signature and no read pairing, so the
/// fastq content checks skip both for this platform.
pub const PLATFORM_ULTIMA: &str = "25acccbd-cb36-463b-ac96-adbac11227e6";

pub fn is_long_read_platform(uuid: &str) -> bool {
    LONG_READ_PLATFORMS.contains(&uuid)
}

/// Accession derived from a local path: file name up to the first dot.
pub fn accession_from_path(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}
