//! Fixed-layout variant tables exchanged between the `seqvars` stages.
//!
//! The column names and their order are an external contract: they are read
//! back by the annotator (which treats the first eight columns as VCF) and by the
//! downstream stages.

use std::{io::Write, path::Path};

use crate::common::io::open_write_maybe_gz;

/// Columns of the filtered, allele-split table handed to the annotator.
pub const ALLELE_COLUMNS: &[&str] = &[
    "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "VEP", "AD_alt", "DP", "VAF_alt",
    "VAF_ref", "ALT_num", "var_type", "GT", "AD", "GQ", "PGT", "PID", "PL", "SB", "INFO",
];

/// Columns of the table restricted to the canonical transcript annotation.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "#CHROM",
    "POS",
    "ID",
    "REF",
    "ALT",
    "QUAL",
    "AD_alt",
    "DP",
    "VAF_alt",
    "VAF_ref",
    "ALT_num",
    "var_type",
    "Consequence",
    "IMPACT",
    "SYMBOL",
    "ENST",
    "CDS_pos",
    "Prot_pos",
    "AA_change",
    "rs_ID",
    "ENSP",
    "gnomAD_AF",
    "gnomAD_AF_NFE",
    "GT",
    "AD",
    "GQ",
    "PGT",
    "PID",
    "PL",
    "SB",
    "INFO",
    "VEP_cano",
    "FILTER",
    "VEP",
];

/// Classification of a variant by the lengths of its reference and alternative allele.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum VarType {
    /// Single nucleotide variant.
    #[serde(rename = "SNV")]
    #[strum(serialize = "SNV")]
    Snv,
    /// Insertion or deletion.
    Indel,
    /// Multi-nucleotide variant.
    #[serde(rename = "MNV")]
    #[strum(serialize = "MNV")]
    Mnv,
    /// Anything else, e.g., empty alleles.
    Unknown,
}

impl VarType {
    /// Classify the change from `reference` to `alternative`.
    pub fn classify(reference: &str, alternative: &str) -> Self {
        let ref_len = reference.chars().count();
        let alt_len = alternative.chars().count();
        if ref_len != alt_len {
            VarType::Indel
        } else if ref_len == 1 {
            VarType::Snv
        } else if ref_len > 1 {
            VarType::Mnv
        } else {
            VarType::Unknown
        }
    }
}

/// One alternative allele of a call, with depths and allele fractions.
///
/// After annotation, `vep` holds the annotator's `CSQ` blob.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlleleRecord {
    #[serde(rename = "#CHROM")]
    pub chrom: String,
    #[serde(rename = "POS")]
    pub pos: i32,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "REF")]
    pub reference: String,
    #[serde(rename = "ALT")]
    pub alternative: String,
    #[serde(rename = "QUAL")]
    pub qual: String,
    #[serde(rename = "FILTER")]
    pub filter: String,
    #[serde(rename = "VEP")]
    pub vep: String,
    /// Depth of the alternative allele.
    #[serde(rename = "AD_alt")]
    pub ad_alt: u32,
    /// Total depth.
    #[serde(rename = "DP")]
    pub dp: u32,
    /// Fraction of reads supporting the alternative allele.
    #[serde(rename = "VAF_alt")]
    pub vaf_alt: f64,
    /// Fraction of reads supporting the reference allele.
    #[serde(rename = "VAF_ref")]
    pub vaf_ref: f64,
    /// Number of alternative alleles of the original call.
    #[serde(rename = "ALT_num")]
    pub alt_num: usize,
    pub var_type: VarType,
    #[serde(rename = "GT")]
    pub gt: Option<String>,
    #[serde(rename = "AD")]
    pub ad: Option<String>,
    #[serde(rename = "GQ")]
    pub gq: Option<String>,
    #[serde(rename = "PGT")]
    pub pgt: Option<String>,
    #[serde(rename = "PID")]
    pub pid: Option<String>,
    #[serde(rename = "PL")]
    pub pl: Option<String>,
    #[serde(rename = "SB")]
    pub sb: Option<String>,
    #[serde(rename = "INFO")]
    pub info: String,
}

/// An allele restricted to its canonical transcript annotation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "#CHROM")]
    pub chrom: String,
    #[serde(rename = "POS")]
    pub pos: i32,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "REF")]
    pub reference: String,
    #[serde(rename = "ALT")]
    pub alternative: String,
    #[serde(rename = "QUAL")]
    pub qual: String,
    #[serde(rename = "AD_alt")]
    pub ad_alt: u32,
    #[serde(rename = "DP")]
    pub dp: u32,
    #[serde(rename = "VAF_alt")]
    pub vaf_alt: f64,
    #[serde(rename = "VAF_ref")]
    pub vaf_ref: f64,
    #[serde(rename = "ALT_num")]
    pub alt_num: usize,
    pub var_type: VarType,
    #[serde(rename = "Consequence")]
    pub consequence: String,
    #[serde(rename = "IMPACT")]
    pub impact: String,
    #[serde(rename = "SYMBOL")]
    pub symbol: String,
    #[serde(rename = "ENST")]
    pub enst: String,
    #[serde(rename = "CDS_pos")]
    pub cds_pos: String,
    #[serde(rename = "Prot_pos")]
    pub prot_pos: String,
    #[serde(rename = "AA_change")]
    pub aa_change: String,
    #[serde(rename = "rs_ID")]
    pub rs_id: String,
    #[serde(rename = "ENSP")]
    pub ensp: String,
    #[serde(rename = "gnomAD_AF")]
    pub gnomad_af: String,
    #[serde(rename = "gnomAD_AF_NFE")]
    pub gnomad_af_nfe: String,
    #[serde(rename = "GT")]
    pub gt: Option<String>,
    #[serde(rename = "AD")]
    pub ad: Option<String>,
    #[serde(rename = "GQ")]
    pub gq: Option<String>,
    #[serde(rename = "PGT")]
    pub pgt: Option<String>,
    #[serde(rename = "PID")]
    pub pid: Option<String>,
    #[serde(rename = "PL")]
    pub pl: Option<String>,
    #[serde(rename = "SB")]
    pub sb: Option<String>,
    #[serde(rename = "INFO")]
    pub info: String,
    /// The selected annotation entry.
    #[serde(rename = "VEP_cano")]
    pub vep_cano: String,
    #[serde(rename = "FILTER")]
    pub filter: String,
    #[serde(rename = "VEP")]
    pub vep: String,
}

/// Write `header` and then `records` as tab-separated text to `writer`.
///
/// The header is written even if there are no records.
pub fn write_records<W, T>(writer: W, header: &[&str], records: &[T]) -> Result<(), anyhow::Error>
where
    W: Write,
    T: serde::Serialize,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(header)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write records to `path`, gzip-compressed if it ends in `.gz`.
pub fn write_records_path<P, T>(path: P, header: &[&str], records: &[T]) -> Result<(), anyhow::Error>
where
    P: AsRef<Path>,
    T: serde::Serialize,
{
    let writer = open_write_maybe_gz(path.as_ref()).map_err(|e| {
        anyhow::anyhow!("could not open {:?} for writing: {}", path.as_ref(), e)
    })?;
    write_records(writer, header, records)
}

/// Read records of type `T` from `text` (header line first, no `##` lines).
pub fn read_records<T>(text: &str) -> Result<Vec<T>, anyhow::Error>
where
    T: serde::de::DeserializeOwned,
{
    let mut reader = crate::common::table::tsv_reader(text.as_bytes());
    let mut result = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        let record: T =
            record.map_err(|e| anyhow::anyhow!("problem parsing record {}: {}", i + 1, e))?;
        result.push(record);
    }
    Ok(result)
}
