//! Implementation of `seqvars prefilter` subcommand.
//!
//! Selects real variant calls from the region-restricted gVCF table, splits
//! multi-allelic calls, computes allele fractions, and runs the annotator.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use thousands::Separable;

use crate::{
    common::{
        self,
        filter::{FilterChain, FilterReport, FilterStage, Verdict},
        table::Table,
        GenomeRelease,
    },
    err::SchemaError,
    seqvars::schema::{write_records_path, AlleleRecord, VarType, ALLELE_COLUMNS},
};

pub mod annotator;
pub mod genotype;

use annotator::{Annotator, AnnotatorConfig, Vep};
use genotype::SampleFields;

/// Placeholder allele of gVCF reference blocks.
pub const NON_REF: &str = "<NON_REF>";

/// Command line arguments for `seqvars prefilter` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "filter and split CH variant calls, then annotate", long_about = None)]
pub struct Args {
    /// Path to input file as written by `seqvars extract`.
    #[clap(long)]
    pub path_input: PathBuf,
    /// Path to output folder; the unannotated file goes to its `temp` sub folder.
    #[clap(long)]
    pub path_output_dir: PathBuf,
    /// Path to JSON file with the annotator configuration.
    #[clap(long)]
    pub path_annotator_config: Option<PathBuf>,
    /// Genome assembly to annotate with, overrides the configuration file.
    #[clap(long, value_enum)]
    pub assembly: Option<GenomeRelease>,
    /// Path to the annotator's offline cache, overrides the configuration file.
    #[clap(long)]
    pub path_vep_cache: Option<PathBuf>,
    /// Only write the filtered file, do not run the annotator.
    #[clap(long, default_value_t = false)]
    pub skip_annotation: bool,
}

impl Args {
    /// Build the annotator configuration from the file and the overrides.
    pub fn annotator_config(&self) -> Result<AnnotatorConfig, anyhow::Error> {
        let mut config = match &self.path_annotator_config {
            Some(path) => AnnotatorConfig::from_path(path)?,
            None => AnnotatorConfig::default(),
        };
        if let Some(assembly) = self.assembly {
            config.assembly = assembly;
        }
        if let Some(path_vep_cache) = &self.path_vep_cache {
            config.path_cache = Some(path_vep_cache.clone());
        }
        Ok(config)
    }
}

/// Output paths of the `seqvars prefilter` step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Filtered and split file, input to the annotator.
    pub filtered: PathBuf,
    /// Annotated file.
    pub annotated: PathBuf,
}

impl OutputPaths {
    pub fn new(path_input: &Path, path_output_dir: &Path) -> Result<Self, anyhow::Error> {
        let stem = common::sample_stem(path_input)?;
        Ok(Self {
            filtered: path_output_dir
                .join("temp")
                .join(format!("{}.maf.filt.gz", &stem)),
            annotated: path_output_dir.join(format!("{}.maf.vep.gz", &stem)),
        })
    }
}

/// Column indices of the region-restricted gVCF table.
#[derive(Debug, Clone, Copy)]
struct Columns {
    chrom: usize,
    pos: usize,
    id: usize,
    reference: usize,
    alternative: usize,
    qual: usize,
    filter: usize,
    info: usize,
    format: Option<usize>,
    sample: usize,
}

impl Columns {
    fn new(table: &Table) -> Result<Self, SchemaError> {
        let columns = Self {
            chrom: table.column("#CHROM")?,
            pos: table.column("POS")?,
            id: table.column("ID")?,
            reference: table.column("REF")?,
            alternative: table.column("ALT")?,
            qual: table.column("QUAL")?,
            filter: table.column("FILTER")?,
            info: table.column("INFO")?,
            format: table.column("FORMAT").ok(),
            sample: table.header.len().saturating_sub(1),
        };
        let fixed = [
            columns.chrom,
            columns.pos,
            columns.id,
            columns.reference,
            columns.alternative,
            columns.qual,
            columns.filter,
            columns.info,
        ];
        if fixed.contains(&columns.sample) || columns.format == Some(columns.sample) {
            return Err(SchemaError::MissingColumn("sample".to_string()));
        }
        Ok(columns)
    }

    fn sample_fields(&self, row: &[String]) -> Result<SampleFields, crate::err::GenotypeError> {
        SampleFields::parse(
            &row[self.sample],
            self.format.map(|format| row[format].as_str()),
        )
    }

    fn describe(&self, row: &[String]) -> String {
        format!(
            "{}:{} {}>{}",
            &row[self.chrom], &row[self.pos], &row[self.reference], &row[self.alternative]
        )
    }
}

/// A variant call after genotype parsing, `<NON_REF>` removed from the ALT list.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub chrom: String,
    pub pos: i32,
    pub id: String,
    pub reference: String,
    /// Comma-separated alternative alleles.
    pub alternative: String,
    pub qual: String,
    pub filter: String,
    pub info: String,
    pub sample: SampleFields,
}

impl CallRecord {
    /// Alternative alleles.
    pub fn alternatives(&self) -> Vec<&str> {
        self.alternative.split(',').collect()
    }

    /// Whether the call has more than one alternative allele.
    pub fn is_multi_allelic(&self) -> bool {
        self.alternative.contains(',')
    }

    fn describe(&self) -> String {
        format!(
            "{}:{} {}>{}",
            &self.chrom, self.pos, &self.reference, &self.alternative
        )
    }
}

/// Remove a trailing `<NON_REF>` entry from the comma-separated `alternative`.
pub fn strip_non_ref(alternative: &str) -> String {
    match alternative.rsplit_once(',') {
        Some((head, NON_REF)) => head.to_string(),
        _ if alternative == NON_REF => String::new(),
        _ => alternative.to_string(),
    }
}

fn parse_count(value: Option<&str>, what: &str, call: &CallRecord) -> Result<u32, anyhow::Error> {
    let value = value.ok_or_else(|| anyhow::anyhow!("missing {} in {}", what, call.describe()))?;
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {} {:?} in {}: {}", what, value, call.describe(), e))
}

/// Split `call` into one record per alternative allele.
///
/// The allele depth of the `i`-th alternative allele is the `(i+1)`-th `AD`
/// component; both fractions are relative to `DP`.
pub fn split_alleles(call: &CallRecord) -> Result<Vec<AlleleRecord>, anyhow::Error> {
    let dp = parse_count(call.sample.dp.as_deref(), "DP", call)?;
    if dp == 0 {
        anyhow::bail!("DP of zero in {}", call.describe());
    }
    let ad_ref = parse_count(call.sample.allele_depth(0), "AD", call)?;
    let alternatives = call.alternatives();
    let alt_num = alternatives.len();

    alternatives
        .iter()
        .enumerate()
        .map(|(i, alternative)| -> Result<AlleleRecord, anyhow::Error> {
            let ad_alt = parse_count(call.sample.allele_depth(i + 1), "AD", call)?;
            Ok(AlleleRecord {
                chrom: call.chrom.clone(),
                pos: call.pos,
                id: call.id.clone(),
                reference: call.reference.clone(),
                alternative: alternative.to_string(),
                qual: call.qual.clone(),
                filter: call.filter.clone(),
                vep: String::new(),
                ad_alt,
                dp,
                vaf_alt: ad_alt as f64 / dp as f64,
                vaf_ref: ad_ref as f64 / dp as f64,
                alt_num,
                var_type: VarType::classify(&call.reference, alternative),
                gt: call.sample.gt.clone(),
                ad: call.sample.ad.clone(),
                gq: call.sample.gq.clone(),
                pgt: call.sample.pgt.clone(),
                pid: call.sample.pid.clone(),
                pl: call.sample.pl.clone(),
                sb: call.sample.sb.clone(),
                info: call.info.clone(),
            })
        })
        .collect()
}

/// Filter the calls of `table` and split them into per-allele records.
///
/// Records of bi-allelic calls come first, followed by the records of
/// multi-allelic calls, each in input order.
pub fn filter_and_split(table: &Table) -> Result<(Vec<AlleleRecord>, FilterReport), anyhow::Error> {
    let columns = Columns::new(table)?;

    let rows = table.rows.iter().collect::<Vec<_>>();
    let (rows, mut report) = FilterChain::new()
        .stage(FilterStage::new("non_ref_alt", |row: &&Vec<String>| {
            Ok(if row[columns.alternative].starts_with(NON_REF) {
                Verdict::Drop(columns.describe(row))
            } else {
                Verdict::Keep
            })
        }))
        .stage(FilterStage::new("genotype_arity", |row: &&Vec<String>| {
            Ok(match columns.sample_fields(row) {
                Ok(_) => Verdict::Keep,
                Err(e) => Verdict::Drop(format!("{}: {}", columns.describe(row), e)),
            })
        }))
        .apply(rows)?;

    let calls = rows
        .into_iter()
        .map(|row| -> Result<CallRecord, anyhow::Error> {
            Ok(CallRecord {
                chrom: row[columns.chrom].clone(),
                pos: row[columns.pos].parse().map_err(|e| {
                    anyhow::anyhow!("invalid POS {:?}: {}", &row[columns.pos], e)
                })?,
                id: row[columns.id].clone(),
                reference: row[columns.reference].clone(),
                alternative: strip_non_ref(&row[columns.alternative]),
                qual: row[columns.qual].clone(),
                filter: row[columns.filter].clone(),
                info: row[columns.info].clone(),
                sample: columns.sample_fields(row)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (calls, call_report) = FilterChain::new()
        .stage(FilterStage::new("depth_missing", |call: &CallRecord| {
            let sample = &call.sample;
            let dp = sample
                .dp
                .as_deref()
                .map(|dp| parse_count(Some(dp), "DP", call))
                .transpose()?;
            Ok(
                if sample.ad.is_none()
                    || sample.allele_depth(0).is_none()
                    || sample.allele_depth(1).is_none()
                    || dp.unwrap_or(0) == 0
                {
                    Verdict::Drop(call.describe())
                } else {
                    Verdict::Keep
                },
            )
        }))
        .stage(FilterStage::new("allele_depth_arity", |call: &CallRecord| {
            Ok(
                if call.sample.allele_depth_count() < call.alternatives().len() + 1 {
                    Verdict::Drop(call.describe())
                } else {
                    Verdict::Keep
                },
            )
        }))
        .apply(calls)?;
    report.extend(call_report);

    let (multi, single): (Vec<_>, Vec<_>) =
        calls.into_iter().partition(CallRecord::is_multi_allelic);
    let mut records = Vec::new();
    for call in single.iter().chain(multi.iter()) {
        records.extend(split_alleles(call)?);
    }

    Ok((records, report))
}

/// Process `args.path_input` and annotate with `annotator`.
pub fn run_with_annotator(
    args: &Args,
    annotator: &dyn Annotator,
) -> Result<OutputPaths, anyhow::Error> {
    let paths = OutputPaths::new(&args.path_input, &args.path_output_dir)?;

    tracing::info!("reading input file...");
    let table = Table::from_path(&args.path_input)?;
    tracing::info!(
        "... read {} rows",
        table.rows.len().separate_with_commas()
    );

    tracing::info!("filtering and splitting variants...");
    let (records, report) = filter_and_split(&table)?;
    report.log("seqvars prefilter");
    tracing::info!(
        "... kept {} rows, wrote {} allele records ({} multi-allelic)",
        (table.rows.len() - report.total_dropped()).separate_with_commas(),
        records.len().separate_with_commas(),
        records
            .iter()
            .filter(|r| r.alt_num > 1)
            .count()
            .separate_with_commas()
    );
    tracing::debug!(
        "variant types: {:?}",
        records.iter().map(|r| r.var_type).counts()
    );

    if let Some(parent) = paths.filtered.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("could not create {:?}: {}", parent, e))?;
    }
    write_records_path(&paths.filtered, ALLELE_COLUMNS, &records)?;
    tracing::info!("wrote filtered variants to {:?}", &paths.filtered);

    if args.skip_annotation {
        tracing::warn!("skipping annotation as requested by --skip-annotation");
    } else {
        tracing::info!("annotating to {:?}...", &paths.annotated);
        annotator.annotate(&paths.filtered, &paths.annotated)?;
        tracing::info!("... done annotating");
    }

    Ok(paths)
}

/// Main entry point for `seqvars prefilter` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let config = args.annotator_config()?;
    tracing::info!("annotator config = {:#?}", &config);
    run_with_annotator(args, &Vep::new(config))?;

    common::trace_rss_now();
    tracing::info!(
        "All of `seqvars prefilter` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
