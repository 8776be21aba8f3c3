//! Access to the annotator's `CSQ` blob.
//!
//! The blob is a comma-separated list of entries, one per transcript; each entry
//! is a `|`-separated list of fields at fixed positions.

use std::collections::HashSet;

/// Positions of the fields within one `CSQ` entry.
pub mod idx {
    pub const CONSEQUENCE: usize = 1;
    pub const IMPACT: usize = 2;
    pub const SYMBOL: usize = 3;
    pub const FEATURE: usize = 6;
    pub const CDS_POSITION: usize = 13;
    pub const PROTEIN_POSITION: usize = 14;
    pub const AMINO_ACIDS: usize = 15;
    pub const EXISTING_VARIATION: usize = 17;
    pub const ENSP: usize = 24;
    pub const GNOMAD_AF: usize = 25;
    pub const GNOMAD_NFE_AF: usize = 31;
}

/// Minimal number of fields per entry.
pub const MIN_FIELDS: usize = idx::GNOMAD_NFE_AF + 1;

/// Value of the `VEP` column for variants without annotation.
pub const NO_ANNOTATION: &str = ".";

/// Fields extracted from the canonical transcript's entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsqFields {
    pub consequence: String,
    pub impact: String,
    pub symbol: String,
    pub transcript: String,
    pub cds_pos: String,
    pub prot_pos: String,
    pub aa_change: String,
    pub rs_id: String,
    pub protein: String,
    pub gnomad_af: String,
    pub gnomad_af_nfe: String,
}

impl CsqFields {
    /// Extract the fields from `entry`.
    pub fn from_entry(entry: &str) -> Result<Self, anyhow::Error> {
        let fields = entry.split('|').collect::<Vec<_>>();
        if fields.len() < MIN_FIELDS {
            anyhow::bail!(
                "annotation entry has {} fields but at least {} are required: {:?}",
                fields.len(),
                MIN_FIELDS,
                entry
            );
        }
        Ok(Self {
            consequence: fields[idx::CONSEQUENCE].to_string(),
            impact: fields[idx::IMPACT].to_string(),
            symbol: fields[idx::SYMBOL].to_string(),
            transcript: fields[idx::FEATURE].to_string(),
            cds_pos: fields[idx::CDS_POSITION].to_string(),
            prot_pos: fields[idx::PROTEIN_POSITION].to_string(),
            aa_change: fields[idx::AMINO_ACIDS].to_string(),
            rs_id: fields[idx::EXISTING_VARIATION].to_string(),
            protein: fields[idx::ENSP].to_string(),
            gnomad_af: fields[idx::GNOMAD_AF].to_string(),
            gnomad_af_nfe: fields[idx::GNOMAD_NFE_AF].to_string(),
        })
    }
}

/// Return the first entry of `blob` whose transcript is in `transcripts`.
pub fn select_canonical<'a>(blob: &'a str, transcripts: &HashSet<String>) -> Option<&'a str> {
    blob.split(',')
        .filter(|entry| entry.len() > 1)
        .find(|entry| {
            entry
                .split('|')
                .nth(idx::FEATURE)
                .map(|feature| transcripts.contains(feature))
                .unwrap_or(false)
        })
}
