//! Implementation of `seqvars canonical` subcommand.
//!
//! Restricts annotated allele records to the annotation of the canonical
//! transcript of their gene and flattens that annotation into columns.

use std::{collections::HashSet, path::PathBuf};

use thousands::Separable;

use crate::{
    common::{
        self,
        filter::{FilterChain, FilterReport, FilterStage},
        io::read_lines,
        table::read_without_meta,
    },
    seqvars::schema::{
        read_records, write_records_path, AlleleRecord, CanonicalRecord, VarType,
        CANONICAL_COLUMNS,
    },
};

pub mod csq;

use csq::{select_canonical, CsqFields, NO_ANNOTATION};

/// Command line arguments for `seqvars canonical` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "select canonical transcript annotation of CH variants", long_about = None)]
pub struct Args {
    /// Path to annotated file as written by `seqvars prefilter`.
    #[clap(long)]
    pub path_input: PathBuf,
    /// Path to file with canonical transcript identifiers in the first column.
    #[clap(long)]
    pub path_transcripts: PathBuf,
    /// Path to output folder.
    #[clap(long)]
    pub path_output_dir: PathBuf,
    /// Suffix appended to the sample stem to form the output file name.
    #[clap(long, default_value = ".maf.vep2.gz")]
    pub output_suffix: String,
}

/// Load the set of canonical transcript identifiers.
///
/// The identifier is the first tab-separated column; empty lines and lines
/// starting with `#` are ignored.
#[tracing::instrument]
pub fn load_transcripts(path: &std::path::Path) -> Result<HashSet<String>, anyhow::Error> {
    let lines = read_lines(path)
        .and_then(|lines| lines.collect::<Result<Vec<_>, _>>())
        .map_err(|e| anyhow::anyhow!("could not read transcripts from {:?}: {}", path, e))?;
    let result = lines
        .iter()
        .map(|line| line.trim_end())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split('\t').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<HashSet<_>>();
    if result.is_empty() {
        tracing::warn!("no transcripts found in {:?}", path);
    }
    Ok(result)
}

/// Flatten `record` with the selected annotation `entry`.
fn to_canonical(record: AlleleRecord, entry: &str) -> Result<CanonicalRecord, anyhow::Error> {
    let fields = CsqFields::from_entry(entry).map_err(|e| {
        anyhow::anyhow!(
            "invalid annotation of {}:{} {}>{}: {}",
            &record.chrom,
            record.pos,
            &record.reference,
            &record.alternative,
            e
        )
    })?;
    Ok(CanonicalRecord {
        chrom: record.chrom,
        pos: record.pos,
        id: record.id,
        reference: record.reference,
        alternative: record.alternative,
        qual: record.qual,
        ad_alt: record.ad_alt,
        dp: record.dp,
        vaf_alt: record.vaf_alt,
        vaf_ref: record.vaf_ref,
        alt_num: record.alt_num,
        var_type: record.var_type,
        consequence: fields.consequence,
        impact: fields.impact,
        symbol: fields.symbol,
        enst: fields.transcript,
        cds_pos: fields.cds_pos,
        prot_pos: fields.prot_pos,
        aa_change: fields.aa_change,
        rs_id: fields.rs_id,
        ensp: fields.protein,
        gnomad_af: fields.gnomad_af,
        gnomad_af_nfe: fields.gnomad_af_nfe,
        gt: record.gt,
        ad: record.ad,
        gq: record.gq,
        pgt: record.pgt,
        pid: record.pid,
        pl: record.pl,
        sb: record.sb,
        info: record.info,
        vep_cano: entry.to_string(),
        filter: record.filter,
        vep: record.vep,
    })
}

/// Filter `records` and select their canonical transcript annotation.
pub fn select_canonical_records(
    records: Vec<AlleleRecord>,
    transcripts: &HashSet<String>,
) -> Result<(Vec<CanonicalRecord>, FilterReport), anyhow::Error> {
    let (records, report) = FilterChain::new()
        .stage(FilterStage::keep_if("alt_num_gt_2", |r: &AlleleRecord| {
            r.alt_num <= 2
        }))
        .stage(FilterStage::keep_if("multi_alt_indel", |r: &AlleleRecord| {
            !(r.alt_num == 2 && r.var_type == VarType::Indel)
        }))
        .stage(FilterStage::keep_if("ad_alt_zero", |r: &AlleleRecord| {
            r.ad_alt > 0
        }))
        .stage(FilterStage::keep_if("no_annotation", |r: &AlleleRecord| {
            r.vep != NO_ANNOTATION
        }))
        .stage(FilterStage::keep_if(
            "no_canonical_transcript",
            |r: &AlleleRecord| select_canonical(&r.vep, transcripts).is_some(),
        ))
        .apply(records)?;

    let result = records
        .into_iter()
        .map(|record| {
            let entry = select_canonical(&record.vep, transcripts)
                .map(|entry| entry.to_string())
                .unwrap_or_default();
            to_canonical(record, &entry)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((result, report))
}

/// Main entry point for `seqvars canonical` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("loading canonical transcripts...");
    let transcripts = load_transcripts(&args.path_transcripts)?;
    tracing::info!(
        "... loaded {} transcripts",
        transcripts.len().separate_with_commas()
    );

    tracing::info!("reading annotated variants...");
    let records: Vec<AlleleRecord> = read_records(&read_without_meta(&args.path_input)?)
        .map_err(|e| anyhow::anyhow!("problem reading {:?}: {}", &args.path_input, e))?;
    let count_in = records.len();
    tracing::info!("... read {} records", count_in.separate_with_commas());

    let (records, report) = select_canonical_records(records, &transcripts)?;
    report.log("seqvars canonical");
    tracing::info!(
        "... kept {} of {} records",
        records.len().separate_with_commas(),
        count_in.separate_with_commas()
    );

    let path_output = args.path_output_dir.join(format!(
        "{}{}",
        common::sample_stem(&args.path_input)?,
        &args.output_suffix
    ));
    std::fs::create_dir_all(&args.path_output_dir)
        .map_err(|e| anyhow::anyhow!("could not create {:?}: {}", &args.path_output_dir, e))?;
    write_records_path(&path_output, CANONICAL_COLUMNS, &records)?;
    tracing::info!("wrote output to {:?}", &path_output);

    common::trace_rss_now();
    tracing::info!(
        "All of `seqvars canonical` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::{csq::test::entry, load_transcripts, select_canonical_records, Args};
    use crate::{
        common::table::read_without_meta,
        seqvars::schema::{read_records, test::allele_record, AlleleRecord, CanonicalRecord, VarType},
    };

    fn transcripts() -> HashSet<String> {
        ["ENST00000321117", "ENST00000380013"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn annotated(vep: &str) -> AlleleRecord {
        AlleleRecord {
            vep: vep.to_string(),
            ..allele_record()
        }
    }

    #[test]
    fn selects_and_flattens() -> Result<(), anyhow::Error> {
        let vep = format!(
            "CSQ={},{}",
            entry("intron_variant", "DNMT3A", "ENST00000264709", ""),
            entry("missense_variant", "DNMT3A", "ENST00000321117", "882")
        );

        let (records, report) = select_canonical_records(vec![annotated(&vep)], &transcripts())?;

        assert_eq!(report.total_dropped(), 0);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.consequence, "missense_variant");
        assert_eq!(record.symbol, "DNMT3A");
        assert_eq!(record.enst, "ENST00000321117");
        assert_eq!(record.prot_pos, "882");
        assert_eq!(record.ensp, "ENSP00000324375");
        assert_eq!(
            record.vep_cano,
            entry("missense_variant", "DNMT3A", "ENST00000321117", "882")
        );
        assert_eq!(record.vep, vep);
        assert_eq!(record.ad_alt, 3);

        Ok(())
    }

    #[test]
    fn named_filters() -> Result<(), anyhow::Error> {
        let vep = entry("missense_variant", "DNMT3A", "ENST00000321117", "882");
        let records = vec![
            AlleleRecord {
                alt_num: 3,
                ..annotated(&vep)
            },
            AlleleRecord {
                alt_num: 2,
                var_type: VarType::Indel,
                alternative: "CA".into(),
                ..annotated(&vep)
            },
            AlleleRecord {
                ad_alt: 0,
                ..annotated(&vep)
            },
            annotated("."),
            annotated(&entry("missense_variant", "FOO", "ENST00000999999", "1")),
            AlleleRecord {
                alt_num: 2,
                ..annotated(&vep)
            },
            annotated(&vep),
        ];

        let (records, report) = select_canonical_records(records, &transcripts())?;

        assert_eq!(report.dropped("alt_num_gt_2"), 1);
        assert_eq!(report.dropped("multi_alt_indel"), 1);
        assert_eq!(report.dropped("ad_alt_zero"), 1);
        assert_eq!(report.dropped("no_annotation"), 1);
        assert_eq!(report.dropped("no_canonical_transcript"), 1);
        assert_eq!(
            records.iter().map(|r| r.alt_num).collect::<Vec<_>>(),
            vec![2, 1]
        );

        Ok(())
    }

    #[test]
    fn selection_is_deterministic() -> Result<(), anyhow::Error> {
        let vep = [
            entry("synonymous_variant", "TET2", "ENST00000380013", "12"),
            entry("missense_variant", "DNMT3A", "ENST00000321117", "882"),
        ]
        .join(",");

        let (first, _) = select_canonical_records(vec![annotated(&vep)], &transcripts())?;
        let (second, _) = select_canonical_records(vec![annotated(&vep)], &transcripts())?;

        assert_eq!(first, second);
        assert_eq!(first[0].enst, "ENST00000380013");

        Ok(())
    }

    #[test]
    fn truncated_canonical_entry_is_fatal() {
        let records = vec![annotated("T|missense_variant|MODERATE|DNMT3A|x|Transcript|ENST00000321117")];
        assert!(select_canonical_records(records, &transcripts()).is_err());
    }

    #[test]
    fn load_transcripts_file() -> Result<(), anyhow::Error> {
        let transcripts = load_transcripts(std::path::Path::new(
            "tests/seqvars/canonical/ch_transcripts.tsv",
        ))?;

        assert_eq!(transcripts.len(), 3);
        assert!(transcripts.contains("ENST00000321117"));
        assert!(transcripts.contains("ENST00000380013"));
        assert!(transcripts.contains("ENST00000375687"));

        Ok(())
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let args_common = Default::default();
        let args = Args {
            path_input: "tests/seqvars/canonical/1234567_23161_0_0_ch.maf.vep".into(),
            path_transcripts: "tests/seqvars/canonical/ch_transcripts.tsv".into(),
            path_output_dir: tmpdir.to_path_buf(),
            output_suffix: ".maf.vep2.gz".into(),
        };

        super::run(&args_common, &args)?;

        let path_output = tmpdir.join("1234567_23161_0_0_ch.maf.vep2.gz");
        let text = read_without_meta(&path_output)?;
        assert!(text.starts_with("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tAD_alt\t"));
        let records: Vec<CanonicalRecord> = read_records(&text)?;
        assert_eq!(
            records
                .iter()
                .map(|r| (r.pos, r.symbol.as_str(), r.consequence.as_str()))
                .collect::<Vec<_>>(),
            vec![
                (25_234_373, "DNMT3A", "missense_variant"),
                (105_243_657, "TET2", "stop_gained"),
                (32_434_638, "ASXL1", "frameshift_variant"),
            ]
        );

        Ok(())
    }
}
