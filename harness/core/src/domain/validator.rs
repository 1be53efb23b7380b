// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Planning the external `validateFiles` invocation.
//!
//! The (file_format, file_format_type) pair decides the validator type
//! argument, whether a chromosome-sizes file is needed, and which autosql
//! schema constrains the extra bed columns. Formats with no entry (tar,
//! hdf5, hic, ...) have no format-level validation.

use std::path::Path;

use crate::domain::file::FileRecord;

/// Assemblies published under a trimmed alias resolve to the reference
/// directory of the full assembly.
fn map_assembly(assembly: &str) -> &str {
    match assembly {
        "GRCh38-minimal" => "GRCh38",
        "mm10-minimal" => "mm10",
        other => other,
    }
}

/// Metadata the validator needs but the item lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField {
    pub key: &'static str,
    pub content_error: &'static str,
}

pub const MISSING_ASSEMBLY: MissingField = MissingField {
    key: "assembly",
    content_error: "File metadata lacks assembly information",
};

pub const MISSING_GENOME_ANNOTATION: MissingField = MissingField {
    key: "genome_annotation",
    content_error: "File metadata lacks genome annotation information",
};

/// What to do about format validation for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatValidation {
    /// No format-level validation for this (format, type) pair.
    Unvalidated,
    /// PacBio subreads bams skip both quickcheck and validateFiles.
    Subreads,
    /// Cannot validate until the submitter supplies these fields.
    MissingMetadata(Vec<MissingField>),
    /// Run `validateFiles` with these arguments (path appended last).
    Run(Vec<String>),
}

struct TableEntry {
    tab: bool,
    type_arg: &'static str,
    chrom: bool,
    autosql: Option<&'static str>,
}

const fn plain(type_arg: &'static str) -> TableEntry {
    TableEntry { tab: false, type_arg, chrom: false, autosql: None }
}

const fn chromed(type_arg: &'static str) -> TableEntry {
    TableEntry { tab: false, type_arg, chrom: true, autosql: None }
}

const fn tabbed(type_arg: &'static str) -> TableEntry {
    TableEntry { tab: true, type_arg, chrom: true, autosql: None }
}

const fn schema(type_arg: &'static str, autosql: &'static str) -> TableEntry {
    TableEntry { tab: false, type_arg, chrom: true, autosql: Some(autosql) }
}

const fn tabbed_schema(type_arg: &'static str, autosql: &'static str) -> TableEntry {
    TableEntry { tab: true, type_arg, chrom: true, autosql: Some(autosql) }
}

fn lookup(file_format: &str, format_type: Option<&str>) -> Option<Option<TableEntry>> {
    // Outer None: unmapped pair. Inner None: mapped but unvalidated.
    let entry = match (file_format, format_type) {
        ("fasta", None) => Some(plain("fasta")),
        ("fastq", None) => Some(plain("fastq")),
        ("bam", None) => Some(chromed("bam")),
        ("bigWig", None) => Some(chromed("bigWig")),
        ("bigInteract", None) => Some(schema("bigBed5+13", "interact")),
        // standard bed formats
        ("bed", Some("bed3")) => Some(chromed("bed3")),
        ("bigBed", Some("bed3")) => Some(chromed("bigBed3")),
        ("bed", Some("bed5")) => Some(chromed("bed5")),
        ("bigBed", Some("bed5")) => Some(chromed("bigBed5")),
        ("bed", Some("bed6")) => Some(chromed("bed6")),
        ("bigBed", Some("bed6")) => Some(chromed("bigBed6")),
        ("bed", Some("bed9")) => Some(chromed("bed9")),
        ("bigBed", Some("bed9")) => Some(chromed("bigBed9")),
        ("bedGraph", None) => Some(chromed("bedGraph")),
        // extended "bed+" formats; -tab allows text fields to contain spaces
        ("bed", Some("bed3+")) => Some(tabbed("bed3+")),
        ("bigBed", Some("bed3+")) => Some(tabbed("bigBed3+")),
        ("bed", Some("bed6+")) => Some(tabbed("bed6+")),
        ("bigBed", Some("bed6+")) => Some(tabbed("bigBed6+")),
        ("bed", Some("bed9+")) => Some(tabbed("bed9+")),
        ("bigBed", Some("bed9+")) => Some(tabbed("bigBed9+")),
        // a catch-all shoe-horn (as long as it's tab-delimited)
        ("bed", Some("unknown")) => Some(tabbed("bed3+")),
        ("bigBed", Some("unknown")) => Some(tabbed("bigBed3+")),
        // special bed types
        ("bed", Some("bedLogR")) => Some(schema("bed9+1", "bedLogR")),
        ("bigBed", Some("bedLogR")) => Some(schema("bigBed9+1", "bedLogR")),
        ("bed", Some("bedMethyl")) => Some(schema("bed9+2", "bedMethyl")),
        ("bigBed", Some("bedMethyl")) => Some(schema("bigBed9+2", "bedMethyl")),
        ("bed", Some("broadPeak")) => Some(schema("bed6+3", "broadPeak")),
        ("bigBed", Some("broadPeak")) => Some(schema("bigBed6+3", "broadPeak")),
        ("bed", Some("gappedPeak")) => Some(schema("bed12+3", "gappedPeak")),
        ("bigBed", Some("gappedPeak")) => Some(schema("bigBed12+3", "gappedPeak")),
        ("bed", Some("narrowPeak")) => Some(schema("bed6+4", "narrowPeak")),
        ("bigBed", Some("narrowPeak")) => Some(schema("bigBed6+4", "narrowPeak")),
        ("bed", Some("bedRnaElements")) => Some(schema("bed6+3", "bedRnaElements")),
        // bigBed bedRnaElements validate with the plain bed type
        ("bigBed", Some("bedRnaElements")) => Some(schema("bed6+3", "bedRnaElements")),
        ("bed", Some("bedExonScore")) => Some(schema("bed6+3", "bedExonScore")),
        ("bigBed", Some("bedExonScore")) => Some(schema("bigBed6+3", "bedExonScore")),
        ("bed", Some("bedRrbs")) => Some(schema("bed9+2", "bedRrbs")),
        ("bigBed", Some("bedRrbs")) => Some(schema("bigBed9+2", "bedRrbs")),
        ("bed", Some("enhancerAssay")) => Some(schema("bed9+1", "enhancerAssay")),
        ("bigBed", Some("enhancerAssay")) => Some(schema("bigBed9+1", "enhancerAssay")),
        ("bed", Some("modPepMap")) => Some(schema("bed9+7", "modPepMap")),
        ("bigBed", Some("modPepMap")) => Some(schema("bigBed9+7", "modPepMap")),
        ("bed", Some("pepMap")) => Some(schema("bed9+7", "pepMap")),
        ("bigBed", Some("pepMap")) => Some(schema("bigBed9+7", "pepMap")),
        ("bed", Some("openChromCombinedPeaks")) => Some(schema("bed9+12", "openChromCombinedPeaks")),
        ("bigBed", Some("openChromCombinedPeaks")) => {
            Some(schema("bigBed9+12", "openChromCombinedPeaks"))
        }
        ("bed", Some("peptideMapping")) => Some(schema("bed6+4", "peptideMapping")),
        ("bigBed", Some("peptideMapping")) => Some(schema("bigBed6+4", "peptideMapping")),
        ("bed", Some("shortFrags")) => Some(schema("bed6+21", "shortFrags")),
        ("bigBed", Some("shortFrags")) => Some(schema("bigBed6+21", "shortFrags")),
        ("bed", Some("encode_elements_H3K27ac")) => {
            Some(tabbed_schema("bed9+1", "encode_elements_H3K27ac"))
        }
        ("bigBed", Some("encode_elements_H3K27ac")) => {
            Some(tabbed_schema("bigBed9+1", "encode_elements_H3K27ac"))
        }
        ("bed", Some("encode_elements_H3K9ac")) => {
            Some(tabbed_schema("bed9+1", "encode_elements_H3K9ac"))
        }
        ("bigBed", Some("encode_elements_H3K9ac")) => {
            Some(tabbed_schema("bigBed9+1", "encode_elements_H3K9ac"))
        }
        ("bed", Some("encode_elements_H3K4me1")) => {
            Some(tabbed_schema("bed9+1", "encode_elements_H3K4me1"))
        }
        ("bigBed", Some("encode_elements_H3K4me1")) => {
            Some(tabbed_schema("bigBed9+1", "encode_elements_H3K4me1"))
        }
        ("bed", Some("encode_elements_H3K4me3")) => {
            Some(tabbed_schema("bed9+1", "encode_elements_H3K4me3"))
        }
        ("bigBed", Some("encode_elements_H3K4me3")) => {
            Some(tabbed_schema("bigBed9+1", "encode_elements_H3K4me3"))
        }
        ("bed", Some("dnase_master_peaks")) => {
            Some(tabbed_schema("bed9+1", "dnase_master_peaks"))
        }
        ("bigBed", Some("dnase_master_peaks")) => {
            Some(tabbed_schema("bigBed9+1", "dnase_master_peaks"))
        }
        ("bed", Some("encode_elements_dnase_tf")) => {
            Some(tabbed_schema("bed5+1", "encode_elements_dnase_tf"))
        }
        ("bigBed", Some("encode_elements_dnase_tf")) => {
            Some(tabbed_schema("bigBed5+1", "encode_elements_dnase_tf"))
        }
        ("bed", Some("candidate enhancer predictions")) => {
            Some(schema("bed3+", "candidate_enhancer_prediction"))
        }
        ("bigBed", Some("candidate enhancer predictions")) => {
            Some(schema("bigBed3+", "candidate_enhancer_prediction"))
        }
        ("bed", Some("enhancer predictions")) => Some(schema("bed3+", "enhancer_prediction")),
        ("bigBed", Some("enhancer predictions")) => Some(schema("bigBed3+", "enhancer_prediction")),
        ("bed", Some("idr_peak")) => Some(schema("bed6+", "idr_peak")),
        ("bigBed", Some("idr_peak")) => Some(schema("bigBed6+", "idr_peak")),
        ("bed", Some("tss_peak")) => Some(schema("bed6+", "tss_peak")),
        ("bigBed", Some("tss_peak")) => Some(schema("bigBed6+", "tss_peak")),
        ("bed", Some("idr_ranked_peak")) => Some(schema("bed6+14", "idr_ranked_peak")),
        ("bed", Some("element enrichments")) => Some(schema("bed6+5", "mpra_starr")),
        ("bigBed", Some("element enrichments")) => Some(schema("bigBed6+5", "mpra_starr")),
        ("bed", Some("CRISPR element quantifications")) => {
            Some(schema("bed3+22", "element_quant_format"))
        }

        ("bedpe", None) => Some(chromed("bed3+")),
        ("bedpe", Some("mango")) => Some(chromed("bed3+")),
        // non-bed types
        ("rcc", None) => Some(plain("rcc")),
        ("idat", None) => Some(plain("idat")),
        ("tagAlign", None) => Some(chromed("tagAlign")),
        ("csfasta", None) => Some(plain("csfasta")),
        ("csqual", None) => Some(plain("csqual")),
        (
            "gtf" | "tar" | "tsv" | "csv" | "2bit" | "CEL" | "sam" | "wig" | "hdf5" | "hic"
            | "gff" | "vcf" | "btr",
            None,
        ) => None,
        _ => return None,
    };
    Some(entry)
}

/// Gene and transcriptome alignment bams validate against annotation-level
/// size files instead of assembly-level chrom.sizes.
fn bam_sizes_file(output_type: &str) -> Option<&'static str> {
    match output_type {
        "transcriptome alignments" | "redacted transcriptome alignments" => Some("chrom.sizes"),
        "gene alignments" => Some("gene.sizes"),
        _ => None,
    }
}

/// True for bam output types validated at annotation level. These skip
/// `samtools quickcheck` when their metadata is incomplete; ordinary bams
/// run it regardless.
pub fn is_annotation_level_bam(output_type: &str) -> bool {
    bam_sizes_file(output_type).is_some()
}

pub fn plan_format_validation(item: &FileRecord, enc_valdata: &Path) -> FormatValidation {
    let assembly = item.assembly.as_deref().map(map_assembly);
    let output_type = item.output_type.as_deref().unwrap_or("");

    if item.file_format == "bam" {
        if output_type == "subreads" {
            return FormatValidation::Subreads;
        }
        if let Some(sizes) = bam_sizes_file(output_type) {
            let mut missing = Vec::new();
            if assembly.is_none() {
                missing.push(MISSING_ASSEMBLY);
            }
            if item.genome_annotation.is_none() {
                missing.push(MISSING_GENOME_ANNOTATION);
            }
            if !missing.is_empty() {
                return FormatValidation::MissingMetadata(missing);
            }
            let chrom = format!(
                "-chromInfo={}/{}/{}/{}",
                enc_valdata.display(),
                assembly.unwrap_or_default(),
                item.genome_annotation.as_deref().unwrap_or_default(),
                sizes,
            );
            return FormatValidation::Run(vec!["-type=bam".to_owned(), chrom]);
        }
    }

    let Some(entry) = lookup(&item.file_format, item.file_format_type.as_deref()) else {
        return FormatValidation::Unvalidated;
    };
    let Some(entry) = entry else {
        return FormatValidation::Unvalidated;
    };

    let mut args = Vec::new();
    if entry.tab {
        args.push("-tab".to_owned());
    }
    args.push(format!("-type={}", entry.type_arg));
    if entry.chrom {
        let Some(assembly) = assembly else {
            return FormatValidation::MissingMetadata(vec![MISSING_ASSEMBLY]);
        };
        args.push(format!(
            "-chromInfo={}/{}/chrom.sizes",
            enc_valdata.display(),
            assembly,
        ));
    }
    if let Some(autosql) = entry.autosql {
        args.push(format!("-as={}/as/{autosql}.as", enc_valdata.display()));
    }
    FormatValidation::Run(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn item(format: &str, format_type: Option<&str>) -> FileRecord {
        FileRecord {
            file_format: format.to_owned(),
            file_format_type: format_type.map(str::to_owned),
            assembly: Some("GRCh38".to_owned()),
            ..FileRecord::default()
        }
    }

    fn enc() -> PathBuf {
        PathBuf::from("/opt/encValData")
    }

    #[test]
    fn fastq_needs_no_chrom_info() {
        let plan = plan_format_validation(&item("fastq", None), &enc());
        assert_eq!(plan, FormatValidation::Run(vec!["-type=fastq".to_owned()]));
    }

    #[test]
    fn narrow_peak_gets_schema_and_chrom() {
        let plan = plan_format_validation(&item("bed", Some("narrowPeak")), &enc());
        assert_eq!(
            plan,
            FormatValidation::Run(vec![
                "-type=bed6+4".to_owned(),
                "-chromInfo=/opt/encValData/GRCh38/chrom.sizes".to_owned(),
                "-as=/opt/encValData/as/narrowPeak.as".to_owned(),
            ])
        );
    }

    #[test]
    fn extended_bed_is_tab_delimited() {
        let plan = plan_format_validation(&item("bigBed", Some("bed6+")), &enc());
        assert_eq!(
            plan,
            FormatValidation::Run(vec![
                "-tab".to_owned(),
                "-type=bigBed6+".to_owned(),
                "-chromInfo=/opt/encValData/GRCh38/chrom.sizes".to_owned(),
            ])
        );
    }

    #[test]
    fn minimal_assembly_maps_to_reference_dir() {
        let mut bam = item("bam", None);
        bam.assembly = Some("GRCh38-minimal".to_owned());
        let plan = plan_format_validation(&bam, &enc());
        assert_eq!(
            plan,
            FormatValidation::Run(vec![
                "-type=bam".to_owned(),
                "-chromInfo=/opt/encValData/GRCh38/chrom.sizes".to_owned(),
            ])
        );
    }

    #[test]
    fn transcriptome_bam_uses_annotation_sizes() {
        let mut bam = item("bam", None);
        bam.output_type = Some("transcriptome alignments".to_owned());
        bam.genome_annotation = Some("V29".to_owned());
        let plan = plan_format_validation(&bam, &enc());
        assert_eq!(
            plan,
            FormatValidation::Run(vec![
                "-type=bam".to_owned(),
                "-chromInfo=/opt/encValData/GRCh38/V29/chrom.sizes".to_owned(),
            ])
        );
    }

    #[test]
    fn gene_alignments_use_gene_sizes() {
        let mut bam = item("bam", None);
        bam.output_type = Some("gene alignments".to_owned());
        bam.genome_annotation = Some("V29".to_owned());
        let plan = plan_format_validation(&bam, &enc());
        assert_eq!(
            plan,
            FormatValidation::Run(vec![
                "-type=bam".to_owned(),
                "-chromInfo=/opt/encValData/GRCh38/V29/gene.sizes".to_owned(),
            ])
        );
    }

    #[test]
    fn transcriptome_bam_reports_missing_metadata() {
        let mut bam = item("bam", None);
        bam.assembly = None;
        bam.output_type = Some("transcriptome alignments".to_owned());
        let plan = plan_format_validation(&bam, &enc());
        assert_eq!(
            plan,
            FormatValidation::MissingMetadata(vec![MISSING_ASSEMBLY, MISSING_GENOME_ANNOTATION])
        );
    }

    #[test]
    fn subreads_skip_validation() {
        let mut bam = item("bam", None);
        bam.output_type = Some("subreads".to_owned());
        assert_eq!(plan_format_validation(&bam, &enc()), FormatValidation::Subreads);
    }

    #[test]
    fn chrom_info_requires_assembly() {
        let mut bw = item("bigWig", None);
        bw.assembly = None;
        assert_eq!(
            plan_format_validation(&bw, &enc()),
            FormatValidation::MissingMetadata(vec![MISSING_ASSEMBLY])
        );
    }

    #[test]
    fn container_formats_are_unvalidated() {
        for format in ["tar", "hdf5", "hic", "gtf", "2bit"] {
            assert_eq!(
                plan_format_validation(&item(format, None), &enc()),
                FormatValidation::Unvalidated,
                "{format}"
            );
        }
        // unmapped pairs fall through the same way
        assert_eq!(
            plan_format_validation(&item("bed", Some("no_such_type")), &enc()),
            FormatValidation::Unvalidated
        );
    }
}
