// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Submission-readiness policy for experiments.

pub use checkfiles_portal::{AwardRecord, ExperimentRecord, ReplicateRecord};

/// Funding phase whose older assays get a lower sequencing-depth floor.
pub const MODENCODE_RFA: &str = "modENCODE";

/// Read-depth floor applied to every replicate of a modENCODE experiment.
pub const MODENCODE_MIN_DEPTH: u64 = 500_000;

/// Minimum summed read count per replicate before an experiment counts as
/// submitted, by assay.
pub fn minimum_read_depth(assay_term_name: &str) -> Option<u64> {
    match assay_term_name {
        "ChIP-seq" => Some(20_000_000),
        "RAMPAGE"
        | "shRNA knockdown followed by RNA-seq"
        | "siRNA knockdown followed by RNA-seq"
        | "single cell isolation followed by RNA-seq"
        | "CRISPR genome editing followed by RNA-seq" => Some(10_000_000),
        _ => None,
    }
}

/// File statuses that keep a fastq out of the submitted-replicate tally.
pub const EXCLUDED_FASTQ_STATUSES: &[&str] = &["uploading", "content error", "upload failed"];

/// Statuses excluded from the matching-md5sum audit: these files are not
/// settled enough for their checksum to mean anything.
pub const MD5_AUDIT_EXCLUDED_STATUSES: &[&str] = &["uploading", "upload failed", "content error"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_floors() {
        assert_eq!(minimum_read_depth("ChIP-seq"), Some(20_000_000));
        assert_eq!(minimum_read_depth("RAMPAGE"), Some(10_000_000));
        assert_eq!(
            minimum_read_depth("shRNA knockdown followed by RNA-seq"),
            Some(10_000_000)
        );
        assert_eq!(minimum_read_depth("ATAC-seq"), None);
    }

    #[test]
    fn excluded_statuses() {
        assert!(EXCLUDED_FASTQ_STATUSES.contains(&"uploading"));
        assert!(!EXCLUDED_FASTQ_STATUSES.contains(&"released"));
    }
}
