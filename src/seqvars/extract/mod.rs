//! Implementation of `seqvars extract` subcommand.
//!
//! Restricts a per-sample gVCF to the variants within the CH gene regions.

use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use thousands::Separable;

use crate::common::{self, io::open_write_maybe_gz, table::META_PREFIX};

pub mod regions;

/// Command line arguments for `seqvars extract` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "extract variants in CH gene regions from gVCF", long_about = None)]
pub struct Args {
    /// Path to input gVCF file, optionally gzip-compressed.
    #[clap(long)]
    pub path_input: PathBuf,
    /// Path to BED file with the gene coordinates to extract.
    #[clap(long)]
    pub path_coordinates: PathBuf,
    /// Path to output folder.
    #[clap(long)]
    pub path_output_dir: PathBuf,
    /// Suffix appended to the sample name for the output file.
    #[clap(long, default_value = "_ch.maf.gz")]
    pub output_suffix: String,
}

/// Counters of `extract_regions`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    /// Number of variant lines read.
    pub records_read: usize,
    /// Number of variant lines written.
    pub records_written: usize,
}

/// Copy the header line and all variant lines of `reader` that overlap `region_db`.
///
/// `##` meta lines are dropped.  The first remaining line is the header and must
/// name the `#CHROM` and `POS` columns.
pub fn extract_regions<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    region_db: &regions::RegionDb,
) -> Result<ExtractStats, anyhow::Error> {
    let mut stats = ExtractStats::default();
    let mut columns: Option<(usize, usize)> = None;
    let mut prev = std::time::Instant::now();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with(META_PREFIX) {
            continue;
        }
        let (chrom_idx, pos_idx) = match columns {
            Some(columns) => columns,
            None => {
                let header = line.split('\t').collect::<Vec<_>>();
                let find = |name: &str| {
                    header
                        .iter()
                        .position(|h| *h == name)
                        .ok_or_else(|| anyhow::anyhow!("header line lacks column {}", name))
                };
                columns = Some((find("#CHROM")?, find("POS")?));
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        stats.records_read += 1;
        let fields = line.split('\t').collect::<Vec<_>>();
        let chrom = fields
            .get(chrom_idx)
            .ok_or_else(|| anyhow::anyhow!("line {} has too few columns", lineno + 1))?;
        let pos: i32 = fields
            .get(pos_idx)
            .ok_or_else(|| anyhow::anyhow!("line {} has too few columns", lineno + 1))?
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid POS in line {}: {}", lineno + 1, e))?;

        if region_db.contains(chrom, pos) {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            stats.records_written += 1;
        }

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("at {}:{}", chrom, pos);
            prev = std::time::Instant::now();
        }
    }

    if columns.is_none() {
        anyhow::bail!("input has no header line");
    }

    Ok(stats)
}

/// Main entry point for `seqvars extract` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("loading gene regions...");
    let region_db = regions::load_region_db(&args.path_coordinates)?;
    tracing::info!(
        "... loaded {} regions",
        region_db.len().separate_with_commas()
    );

    let path_out = args.path_output_dir.join(format!(
        "{}{}",
        common::sample_stem(&args.path_input)?,
        &args.output_suffix
    ));

    std::fs::create_dir_all(&args.path_output_dir)
        .map_err(|e| anyhow::anyhow!("could not create {:?}: {}", &args.path_output_dir, e))?;
    tracing::info!("extracting variants to {:?}...", &path_out);
    let reader = common::io::open_read_maybe_gz(&args.path_input).map_err(|e| {
        anyhow::anyhow!("could not open input file {:?}: {}", &args.path_input, e)
    })?;
    let mut writer = open_write_maybe_gz(&path_out)
        .map_err(|e| anyhow::anyhow!("could not open output file {:?}: {}", &path_out, e))?;
    let stats = extract_regions(reader, &mut writer, &region_db)?;
    writer.flush()?;
    tracing::info!(
        "... wrote {} of {} records",
        stats.records_written.separate_with_commas(),
        stats.records_read.separate_with_commas()
    );

    common::trace_rss_now();
    tracing::info!(
        "All of `seqvars extract` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
