// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Fastq read-name signatures.
//!
//! A signature condenses a fastq file's provenance into
//! `flowcell:lane:read_number:barcode:` strings. Two files sharing a
//! signature were sequenced from the same flowcell lane, which the portal
//! treats as a duplicate-submission conflict. Read names come in several
//! grammars (modern Illumina, `/1`-suffixed variants, SRA re-exports,
//! PacBio movies, pre-Casava Illumina); submitters on unrecognized
//! platforms can declare word positions in `read_name_details` metadata
//! instead.
//!
//! Everything here is pure: the caller streams decompressed fastq lines
//! through [`FastqScan`] and applies portal lookups to the result.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufRead};
use std::sync::OnceLock;

use crate::domain::file::FlowcellDetail;
use crate::domain::file::ReadNameDetails;

fn read_name_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(@[a-zA-Z\d]+[a-zA-Z\d_-]*:[a-zA-Z\d-]+:[a-zA-Z\d_-]+:\d+:\d+:\d+:\d+)$",
        )
        .unwrap()
    })
}

fn read_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(@[a-zA-Z\d]+[a-zA-Z\d_-]*:[a-zA-Z\d-]+:[a-zA-Z\d_-]+:\d+:\d+:\d+:\d+[\s_][123]:[YXN]:[0-9]+:([ACNTG\+]*|[0-9]*))$",
        )
        .unwrap()
    })
}

fn special_read_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(@[a-zA-Z\d]+[a-zA-Z\d_-]*:[a-zA-Z\d-]+:[a-zA-Z\d_-]+:\d+:\d+:\d+:\d+[/1|/2]*[\s_][123]:[YXN]:[0-9]+:([ACNTG\+]*|[0-9]*))$",
        )
        .unwrap()
    })
}

fn srr_read_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(@SRR[\d.]+)$").unwrap())
}

fn pacbio_read_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(@m\d{6}_\d{6}_\d+_[a-zA-Z\d_-]+/.*)$|^(@m\d+U?_\d{6}_\d{6}/.*)$|^(@c.+)$",
        )
        .unwrap()
    })
}

fn word_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[:\s_]").unwrap())
}

fn detail_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[:\s]").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s").unwrap())
}

/// Streaming accumulator over a fastq file's records.
#[derive(Debug, Default)]
pub struct FastqScan {
    pub read_numbers: BTreeSet<String>,
    pub signatures: BTreeSet<String>,
    pub signatures_no_barcode: BTreeSet<String>,
    pub read_lengths: BTreeMap<usize, u64>,
    pub read_count: u64,
    /// Last flowcell:lane prefix seen for prefix-style names; `"empty"`
    /// doubles as the "no prefix-style names seen" marker in the
    /// signature-selection rules.
    pub old_illumina_prefix: String,
    /// Last read name that fit no grammar, if any.
    pub unrecognized_name: Option<String>,
    /// A line failed UTF-8 decoding.
    pub bad_encoding: bool,
}

impl FastqScan {
    pub fn new() -> Self {
        Self {
            old_illumina_prefix: "empty".to_owned(),
            ..Self::default()
        }
    }

    /// Consume a decompressed fastq stream. `parse_names` is off for
    /// platforms whose names carry no signature (Ultima).
    pub fn consume<R: BufRead>(
        &mut self,
        mut reader: R,
        parse_names: bool,
        details: Option<&ReadNameDetails>,
    ) -> io::Result<()> {
        let mut line_index = 0u8;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            match std::str::from_utf8(&buf) {
                Err(_) => self.bad_encoding = true,
                Ok(line) => {
                    line_index += 1;
                    if line_index == 1 && parse_names {
                        self.process_read_name(line.trim_end_matches('\n'), details);
                    }
                    if line_index == 2 {
                        self.read_count += 1;
                        self.process_sequence(line);
                    }
                    line_index %= 4;
                }
            }
        }
        Ok(())
    }

    pub fn process_sequence(&mut self, line: &str) {
        let length = line.trim().len();
        *self.read_lengths.entry(length).or_insert(0) += 1;
    }

    pub fn process_read_name(&mut self, line: &str, details: Option<&ReadNameDetails>) {
        self.process_read_name_inner(line.trim(), false, details);
    }

    fn process_read_name_inner(
        &mut self,
        read_name: &str,
        srr_flag: bool,
        details: Option<&ReadNameDetails>,
    ) {
        if let Some(details) = details {
            self.process_with_details(read_name, details);
            return;
        }

        let words: Vec<&str> = whitespace_re().split(read_name).collect();
        if read_name_re().is_match(read_name) {
            self.process_illumina(read_name, srr_flag);
        } else if special_read_name_re().is_match(read_name) {
            self.process_special(read_name, &words, srr_flag);
        } else if srr_read_name_re().is_match(words[0]) {
            // SRA re-export: the read number comes from the SRR token, the
            // signature from the embedded Illumina portion.
            let srr_portion = words[0];
            if srr_portion.matches('.').count() == 2 {
                self.read_numbers
                    .insert(srr_portion.chars().last().unwrap_or('1').to_string());
            } else {
                self.read_numbers.insert("1".to_owned());
            }
            match words.get(1) {
                Some(illumina_portion) => {
                    let rebuilt = format!("@{illumina_portion}");
                    self.process_read_name_inner(&rebuilt, true, details);
                }
                None => self.unrecognized_name = Some(read_name.to_owned()),
            }
        } else if pacbio_read_name_re().is_match(read_name) {
            let movie_identifier = read_name.split('/').next().unwrap_or("");
            if movie_identifier.is_empty() {
                self.unrecognized_name = Some(read_name.to_owned());
            } else {
                self.process_pacbio(read_name);
            }
        } else if words.len() == 1 {
            if read_name_prefix_re().is_match(read_name) {
                self.process_new_illumina_prefix(read_name, srr_flag);
            } else if read_name.len() > 3 && read_name.matches(':').count() > 2 {
                self.process_old_illumina(read_name, srr_flag);
            } else {
                self.unrecognized_name = Some(read_name.to_owned());
            }
        } else {
            self.unrecognized_name = Some(read_name.to_owned());
        }
    }

    fn srr_read_number(&self) -> String {
        self.read_numbers
            .iter()
            .next()
            .cloned()
            .unwrap_or_else(|| "1".to_owned())
    }

    fn add_signature(&mut self, flowcell: &str, lane: &str, read_number: &str, barcode: &str) {
        self.signatures
            .insert(format!("{flowcell}:{lane}:{read_number}:{barcode}:"));
        self.signatures_no_barcode
            .insert(format!("{flowcell}:{lane}:{read_number}:"));
    }

    fn process_with_details(&mut self, read_name: &str, details: &ReadNameDetails) {
        let parts: Vec<&str> = detail_split_re().split(read_name).collect();
        let flowcell = parts.get(details.flowcell_id_location);
        let lane = parts.get(details.lane_id_location);
        let (Some(flowcell), Some(lane)) = (flowcell, lane) else {
            self.unrecognized_name = Some(read_name.to_owned());
            return;
        };
        let read_number = match details.read_number_location {
            None => "1".to_owned(),
            Some(loc) => match parts.get(loc) {
                Some(part) => (*part).to_owned(),
                None => {
                    self.unrecognized_name = Some(read_name.to_owned());
                    return;
                }
            },
        };
        self.read_numbers.insert(read_number.clone());
        let barcode = details
            .barcode_location
            .and_then(|loc| parts.get(loc).copied())
            .unwrap_or("");
        let flowcell = (*flowcell).to_owned();
        let lane = (*lane).to_owned();
        self.add_signature(&flowcell, &lane, &read_number, barcode);
    }

    fn process_illumina(&mut self, read_name: &str, srr_flag: bool) {
        let parts: Vec<&str> = word_split_re().split(read_name).collect();
        if parts.len() < 4 {
            return;
        }
        let flowcell = parts[2].to_owned();
        let lane = parts[3].to_owned();
        let read_number = if srr_flag {
            self.srr_read_number()
        } else {
            let number = parts[parts.len() - 4].to_owned();
            self.read_numbers.insert(number.clone());
            number
        };
        let barcode = parts[parts.len() - 1].to_owned();
        self.add_signature(&flowcell, &lane, &read_number, &barcode);
    }

    fn process_special(&mut self, read_name: &str, words: &[&str], srr_flag: bool) {
        let read_number = if srr_flag {
            self.srr_read_number()
        } else {
            let first = words[0];
            if first.len() > 3 && (first.ends_with("/1") || first.ends_with("/2")) {
                let number = first[first.len() - 1..].to_owned();
                self.read_numbers.insert(number.clone());
                number
            } else {
                "not initialized".to_owned()
            }
        };
        let parts: Vec<&str> = word_split_re().split(read_name).collect();
        if parts.len() < 4 {
            return;
        }
        let flowcell = parts[2].to_owned();
        let lane = parts[3].to_owned();
        let barcode = parts[parts.len() - 1].to_owned();
        self.add_signature(&flowcell, &lane, &read_number, &barcode);
    }

    fn process_new_illumina_prefix(&mut self, read_name: &str, srr_flag: bool) {
        let read_number = if srr_flag {
            self.srr_read_number()
        } else {
            self.read_numbers.insert("1".to_owned());
            "1".to_owned()
        };
        let parts: Vec<&str> = read_name.split(':').collect();
        if parts.len() > 3 {
            let flowcell = parts[2];
            let lane = parts[3];
            let prefix = format!("{flowcell}:{lane}");
            if prefix != self.old_illumina_prefix {
                self.old_illumina_prefix = prefix;
                self.signatures
                    .insert(format!("{flowcell}:{lane}:{read_number}::{read_name}"));
            }
        }
    }

    fn process_pacbio(&mut self, read_name: &str) {
        let parts: Vec<&str> = read_name.split('/').collect();
        if parts.len() > 1 {
            let movie_identifier = parts[0];
            self.signatures
                .insert(format!("pacbio:0:1::{movie_identifier}"));
        }
    }

    fn process_old_illumina(&mut self, read_name: &str, srr_flag: bool) {
        let read_number = if srr_flag {
            self.srr_read_number()
        } else if read_name.len() >= 2
            && (read_name.ends_with("/1") || read_name.ends_with("/2"))
        {
            let number = read_name[read_name.len() - 1..].to_owned();
            self.read_numbers.insert(number.clone());
            number
        } else {
            "1".to_owned()
        };
        let parts: Vec<&str> = read_name.split(':').collect();
        if parts.len() > 1 {
            let prefix = format!("{}:{}", parts[0], parts[1]);
            if prefix != self.old_illumina_prefix {
                self.old_illumina_prefix = prefix;
                let mut flowcell = &parts[0][1..];
                // pre-Casava flowcells with separators are instrument
                // nicknames, not flowcell ids
                if flowcell.contains('-') || flowcell.contains('_') {
                    flowcell = "TEMP";
                }
                // lane defaults to 0 when the second field isn't numeric;
                // the full read name at the end keeps the information
                let lane = if parts[1].chars().all(|c| c.is_ascii_digit()) && !parts[1].is_empty()
                {
                    parts[1]
                } else {
                    "0"
                };
                self.signatures
                    .insert(format!("{flowcell}:{lane}:{read_number}::{read_name}"));
            }
        }
    }

    /// The signature set the portal conflict check should use.
    pub fn signatures_for_comparison(&self, is_umi: bool) -> BTreeSet<String> {
        if self.old_illumina_prefix == "empty" && is_umi {
            return self
                .signatures_no_barcode
                .iter()
                .map(|entry| format!("{entry}UMI:"))
                .collect();
        }
        if self.old_illumina_prefix == "empty" && self.signatures.len() > 100 {
            let filtered = filter_rare_barcodes(&self.signatures);
            if filtered.is_empty() {
                return self
                    .signatures_no_barcode
                    .iter()
                    .map(|entry| format!("{entry}mixed:"))
                    .collect();
            }
            return filtered;
        }
        self.signatures.clone()
    }

    /// Sorted (length, count) pairs for report messages.
    pub fn read_length_pairs(&self) -> Vec<(usize, u64)> {
        self.read_lengths.iter().map(|(k, v)| (*k, *v)).collect()
    }
}

/// Keep barcodes that account for at least 1% of a (flowcell, lane,
/// read_number) group; a sea of singleton barcodes means the barcode field
/// is random (UMI-like) and useless for comparison.
pub fn filter_rare_barcodes(signatures: &BTreeSet<String>) -> BTreeSet<String> {
    let mut groups: BTreeMap<(String, String, String), BTreeMap<String, u64>> = BTreeMap::new();
    for entry in signatures {
        let parts: Vec<&str> = entry.split(':').collect();
        if parts.len() < 5 {
            continue;
        }
        let key = (
            parts[0].to_owned(),
            parts[1].to_owned(),
            parts[2].to_owned(),
        );
        *groups
            .entry(key)
            .or_default()
            .entry(parts[3].to_owned())
            .or_insert(0) += 1;
    }
    let mut kept = BTreeSet::new();
    for ((flowcell, lane, read_number), barcodes) in &groups {
        let total: u64 = barcodes.values().sum();
        for (barcode, count) in barcodes {
            if (total as f64) / (*count as f64) < 100.0 {
                kept.insert(format!("{flowcell}:{lane}:{read_number}:{barcode}:"));
            }
        }
    }
    kept
}

/// Result of checking the observed read lengths against the metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLengthCheck {
    Ok,
    Mismatch { error: String, content_error: String },
}

/// At least `threshold` (e.g. 0.9) of reads must fall within ±2bp of the
/// submitted read length.
pub fn check_read_lengths(
    scan: &FastqScan,
    submitted_read_length: u64,
    threshold: f64,
) -> ReadLengthCheck {
    let in_window: u64 = scan
        .read_lengths
        .iter()
        .filter(|(length, _)| {
            let length = **length as i64;
            let submitted = submitted_read_length as i64;
            (submitted - 2) <= length && length <= (submitted + 2)
        })
        .map(|(_, count)| *count)
        .sum();
    if threshold * (scan.read_count as f64) <= in_window as f64 {
        return ReadLengthCheck::Ok;
    }
    let observed: Vec<String> = scan
        .read_length_pairs()
        .iter()
        .map(|(length, count)| format!("({length}bp, {count})"))
        .collect();
    let observed = observed.join(", ");
    ReadLengthCheck::Mismatch {
        error: format!(
            "in file metadata the read_length is {submitted_read_length}bp, however the uploaded fastq \
             file contains reads of following length(s) {observed}. "
        ),
        content_error: format!(
            "Fastq file metadata specified read length was {submitted_read_length}bp, but the file \
             contains read length(s) {observed}"
        ),
    }
}

/// (lane, barcode) pairs present in both metadata flowcell descriptions.
/// Used to decide whether a prefix-style signature hit is a real conflict.
pub fn flowcell_details_intersect(a: &[FlowcellDetail], b: &[FlowcellDetail]) -> bool {
    let pairs = |details: &[FlowcellDetail]| -> BTreeSet<(String, String)> {
        details
            .iter()
            .filter_map(|entry| match (&entry.lane, &entry.barcode) {
                (Some(lane), Some(barcode)) => Some((lane.clone(), barcode.clone())),
                _ => None,
            })
            .collect()
    };
    !pairs(a).is_disjoint(&pairs(b))
}

/// True when any flowcell entry declares a UMI barcode.
pub fn has_umi_barcode(details: &[FlowcellDetail]) -> bool {
    details
        .iter()
        .any(|entry| entry.barcode.as_deref() == Some("UMI"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan_names(names: &[&str]) -> FastqScan {
        let mut scan = FastqScan::new();
        for name in names {
            scan.process_read_name(name, None);
        }
        scan
    }

    #[test]
    fn modern_illumina_signature() {
        let scan = scan_names(&["@M00911:79:000000000-A5H5C:1:1101:15678:1332 1:N:0:ACGTAC"]);
        assert!(scan
            .signatures
            .contains("000000000-A5H5C:1:1:ACGTAC:"));
        assert!(scan.signatures_no_barcode.contains("000000000-A5H5C:1:1:"));
        assert_eq!(scan.read_numbers.iter().next().map(String::as_str), Some("1"));
    }

    #[test]
    fn slash_suffixed_read_number() {
        let scan = scan_names(&["@HWI-ST123:79:FC1234:2:1101:15678:1332/2 2:N:0:ACGT"]);
        assert!(scan.signatures.contains("FC1234:2:2:ACGT:"));
        assert!(scan.read_numbers.contains("2"));
    }

    #[test]
    fn srr_names_reuse_embedded_illumina_portion() {
        let scan = scan_names(&["@SRR1234.5.2 M00911:79:FC999:3:1101:1:2"]);
        // read number comes from the dotted SRR token
        assert!(scan.read_numbers.contains("2"));
        // the embedded Illumina portion is prefix-style, so the signature
        // embeds the rebuilt name with the SRR-derived read number
        assert!(scan
            .signatures
            .contains("FC999:3:2::@M00911:79:FC999:3:1101:1:2"));
    }

    #[test]
    fn pacbio_movie_signature() {
        let scan = scan_names(&["@m140415_143853_42175_c100635972550000001823121909121417_s1_p0/1138/0_10535"]);
        assert!(scan
            .signatures
            .contains("pacbio:0:1::@m140415_143853_42175_c100635972550000001823121909121417_s1_p0"));
    }

    #[test]
    fn bare_prefix_embeds_whole_read_name() {
        let scan = scan_names(&["@M00911:79:FC888:7:1101:15678:1332"]);
        assert!(scan
            .signatures
            .contains("FC888:7:1::@M00911:79:FC888:7:1101:15678:1332"));
        assert_eq!(scan.old_illumina_prefix, "FC888:7");
    }

    #[test]
    fn old_illumina_separator_flowcell_becomes_temp() {
        let scan = scan_names(&["@HWI-EAS229_1:2:1:7:119/1"]);
        assert!(scan
            .signatures
            .iter()
            .any(|s| s.starts_with("TEMP:2:1::")));
        assert!(scan.read_numbers.contains("1"));
    }

    #[test]
    fn old_illumina_non_numeric_lane_defaults_to_zero() {
        let scan = scan_names(&["@FC12345:abc:1:7:119:200"]);
        assert!(scan.signatures.iter().any(|s| s.starts_with("FC12345:0:1::")));
    }

    #[test]
    fn unrecognized_name_is_recorded() {
        let scan = scan_names(&["@?? ?? ??"]);
        assert_eq!(scan.unrecognized_name.as_deref(), Some("@?? ?? ??"));
        assert!(scan.signatures.is_empty());
    }

    #[test]
    fn details_override_grammar_detection() {
        let details = ReadNameDetails {
            flowcell_id_location: 1,
            lane_id_location: 2,
            read_number_location: Some(3),
            barcode_location: None,
        };
        let mut scan = FastqScan::new();
        scan.process_read_name("@custom:FCX:4:2:whatever", Some(&details));
        assert!(scan.signatures.contains("FCX:4:2::"));
        assert!(scan.signatures_no_barcode.contains("FCX:4:2:"));
    }

    #[test]
    fn consume_counts_reads_and_lengths() {
        let fastq = "@M00911:79:FC888:7:1101:1:2 1:N:0:ACGT\n\
                     ACGTACGTAC\n\
                     +\n\
                     FFFFFFFFFF\n\
                     @M00911:79:FC888:7:1101:1:3 1:N:0:ACGT\n\
                     ACGTACGT\n\
                     +\n\
                     FFFFFFFF\n";
        let mut scan = FastqScan::new();
        scan.consume(Cursor::new(fastq), true, None).unwrap();
        assert_eq!(scan.read_count, 2);
        assert_eq!(scan.read_lengths.get(&10), Some(&1));
        assert_eq!(scan.read_lengths.get(&8), Some(&1));
        assert!(scan.signatures.contains("FC888:7:1:ACGT:"));
    }

    #[test]
    fn rare_barcodes_are_dropped() {
        let mut signatures = BTreeSet::new();
        // 200 singleton barcodes plus one dominant barcode
        for i in 0..200 {
            signatures.insert(format!("FC1:1:1:BC{i:04}:"));
        }
        let filtered = filter_rare_barcodes(&signatures);
        assert!(filtered.is_empty());

        // a barcode at 50% survives
        let mut signatures = BTreeSet::new();
        signatures.insert("FC1:1:1:GOOD:".to_owned());
        signatures.insert("FC1:1:1:ALSOGOOD:".to_owned());
        let filtered = filter_rare_barcodes(&signatures);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn umi_selection_tags_barcode_free_signatures() {
        let mut scan = FastqScan::new();
        scan.signatures_no_barcode.insert("FC1:1:1:".to_owned());
        let selected = scan.signatures_for_comparison(true);
        assert!(selected.contains("FC1:1:1:UMI:"));
    }

    #[test]
    fn mixed_fallback_when_all_barcodes_are_rare() {
        let mut scan = FastqScan::new();
        for i in 0..200 {
            scan.signatures.insert(format!("FC1:1:1:BC{i:04}:"));
        }
        scan.signatures_no_barcode.insert("FC1:1:1:".to_owned());
        let selected = scan.signatures_for_comparison(false);
        assert_eq!(selected.len(), 1);
        assert!(selected.contains("FC1:1:1:mixed:"));
    }

    #[test]
    fn prefix_style_signatures_pass_through_selection() {
        let mut scan = FastqScan::new();
        scan.old_illumina_prefix = "FC1:1".to_owned();
        scan.signatures.insert("FC1:1:1::@FC1:1:7:8:9".to_owned());
        let selected = scan.signatures_for_comparison(false);
        assert!(selected.contains("FC1:1:1::@FC1:1:7:8:9"));
    }

    #[test]
    fn read_length_window_tolerates_two_bp() {
        let mut scan = FastqScan::new();
        scan.read_count = 100;
        scan.read_lengths.insert(50, 95);
        scan.read_lengths.insert(48, 5);
        assert_eq!(check_read_lengths(&scan, 50, 0.9), ReadLengthCheck::Ok);
    }

    #[test]
    fn read_length_mismatch_reports_distribution() {
        let mut scan = FastqScan::new();
        scan.read_count = 100;
        scan.read_lengths.insert(36, 80);
        scan.read_lengths.insert(100, 20);
        match check_read_lengths(&scan, 100, 0.9) {
            ReadLengthCheck::Mismatch { error, .. } => {
                assert!(error.contains("100bp"));
                assert!(error.contains("(36bp, 80)"));
            }
            ReadLengthCheck::Ok => panic!("expected mismatch"),
        }
    }

    #[test]
    fn flowcell_intersection_needs_lane_and_barcode() {
        let a = vec![FlowcellDetail {
            flowcell: Some("FC1".to_owned()),
            lane: Some("1".to_owned()),
            barcode: Some("ACGT".to_owned()),
        }];
        let b = vec![FlowcellDetail {
            flowcell: Some("FC2".to_owned()),
            lane: Some("1".to_owned()),
            barcode: Some("ACGT".to_owned()),
        }];
        let c = vec![FlowcellDetail {
            flowcell: Some("FC1".to_owned()),
            lane: Some("2".to_owned()),
            barcode: Some("ACGT".to_owned()),
        }];
        assert!(flowcell_details_intersect(&a, &b));
        assert!(!flowcell_details_intersect(&a, &c));
        assert!(!flowcell_details_intersect(&a, &[]));
    }

    #[test]
    fn umi_detection() {
        let details = vec![FlowcellDetail {
            flowcell: None,
            lane: Some("1".to_owned()),
            barcode: Some("UMI".to_owned()),
        }];
        assert!(has_umi_barcode(&details));
        assert!(!has_umi_barcode(&[]));
    }
}
