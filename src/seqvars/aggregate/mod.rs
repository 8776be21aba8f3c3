//! Implementation of `seqvars aggregate` subcommand.
//!
//! Collects the CH mutations of a slice of per-sample canonical tables into one
//! cohort table, tagging each row with the patient identifier.

use std::path::{Path, PathBuf};

use thousands::Separable;

use crate::{
    common::{
        self,
        filter::{FilterChain, FilterReport, FilterStage, Verdict},
        io::read_lines,
        table::Table,
    },
    err::SchemaError,
    seqvars::schema::CANONICAL_COLUMNS,
};

/// Consequence terms that qualify a variant as protein-altering.
pub const DEFAULT_CONSEQUENCES: &[&str] = &[
    "transcript_ablation",
    "splice_acceptor_variant",
    "splice_donor_variant",
    "stop_gained",
    "frameshift_variant",
    "stop_lost",
    "start_lost",
    "transcript_amplification",
    "inframe_insertion",
    "inframe_deletion",
    "missense_variant",
    "protein_altering_variant",
    "splice_region_variant",
    "incomplete_terminal_codon_variant",
    "start_retained_variant",
    "stop_retained_variant",
];

/// Name of the column added to the cohort table.
pub const PATIENT_COLUMN: &str = "patient";

/// Command line arguments for `seqvars aggregate` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "aggregate CH mutations of a cohort", long_about = None)]
pub struct Args {
    /// Folder with the per-sample files, or `@path` to a file with one path per line.
    #[clap(long)]
    pub path_input: String,
    /// Suffix of the per-sample files in the input folder.
    #[clap(long, default_value = ".maf.vep2.gz")]
    pub input_suffix: String,
    /// Index of the first file of the sorted listing to include.
    #[clap(long)]
    pub first_file: usize,
    /// Index one past the last file of the sorted listing to include.
    #[clap(long)]
    pub last_file: usize,
    /// Path to output folder.
    #[clap(long)]
    pub path_output_dir: PathBuf,
    /// Optional table whose header defines the expected columns.
    #[clap(long)]
    pub path_schema_reference: Option<PathBuf>,
    /// Minimal depth of the alternative allele.
    #[clap(long, default_value_t = 2)]
    pub min_ad_alt: u32,
    /// Maximal fraction of the alternative allele.
    #[clap(long, default_value_t = 0.3333)]
    pub max_vaf_alt: f64,
    /// Consequence terms to keep; a variant qualifies if its consequence contains any.
    #[clap(long, value_delimiter = ',', default_values_t = DEFAULT_CONSEQUENCES.iter().map(|s| s.to_string()).collect::<Vec<_>>())]
    pub consequences: Vec<String>,
}

impl Args {
    /// File name of the cohort table.
    pub fn output_file_name(&self) -> String {
        format!("CHmutations_{}_{}.txt.gz", self.first_file, self.last_file)
    }
}

/// List the per-sample files, sorted by file name.
///
/// With `@path`, the files are read from `path`, one per line; otherwise all
/// files in the folder `path_input` ending in `suffix` are taken.
pub fn list_inputs(path_input: &str, suffix: &str) -> Result<Vec<PathBuf>, anyhow::Error> {
    let mut result = Vec::new();
    if let Some(path) = path_input.strip_prefix('@') {
        let path = shellexpand::tilde(&path).into_owned();
        let lines = read_lines(&path)
            .map_err(|e| anyhow::anyhow!("could not read file list {}: {}", &path, e))?;
        for line in lines {
            let line = line?;
            let line = line.trim();
            if !line.is_empty() {
                result.push(PathBuf::from(shellexpand::tilde(line).into_owned()));
            }
        }
    } else {
        let path = shellexpand::tilde(path_input).into_owned();
        let entries = std::fs::read_dir(&path)
            .map_err(|e| anyhow::anyhow!("could not list folder {}: {}", &path, e))?;
        for entry in entries {
            let entry = entry?;
            let is_match = entry
                .file_name()
                .to_str()
                .map(|name| name.ends_with(suffix))
                .unwrap_or(false);
            if is_match && entry.file_type()?.is_file() {
                result.push(entry.path());
            }
        }
    }
    result.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    Ok(result)
}

/// Select the files `first..last` of `paths`, clamped to the listing.
pub fn select_slice(
    paths: &[PathBuf],
    first: usize,
    last: usize,
) -> Result<&[PathBuf], anyhow::Error> {
    if first > last {
        anyhow::bail!("first file index {} is after last file index {}", first, last);
    }
    let last = last.min(paths.len());
    let first = first.min(last);
    Ok(&paths[first..last])
}

/// Patient identifier of a per-sample file, the file name up to the first `_`.
pub fn patient_id(path: &Path) -> Result<String, anyhow::Error> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("no file name in path {:?}", path))?;
    Ok(file_name.split('_').next().unwrap_or(file_name).to_string())
}

/// Thresholds for calling a variant a CH mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub min_ad_alt: u32,
    pub max_vaf_alt: f64,
    pub consequences: Vec<String>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_ad_alt: 2,
            max_vaf_alt: 0.3333,
            consequences: DEFAULT_CONSEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&Args> for Thresholds {
    fn from(args: &Args) -> Self {
        Self {
            min_ad_alt: args.min_ad_alt,
            max_vaf_alt: args.max_vaf_alt,
            consequences: args.consequences.clone(),
        }
    }
}

/// Keep the rows of `table` that pass `thresholds`.
pub fn select_mutations(
    table: Table,
    thresholds: &Thresholds,
) -> Result<(Table, FilterReport), anyhow::Error> {
    let ad_alt = table.column("AD_alt")?;
    let vaf_alt = table.column("VAF_alt")?;
    let prot_pos = table.column("Prot_pos")?;
    let consequence = table.column("Consequence")?;

    let Table { header, rows } = table;
    let (rows, report) = FilterChain::new()
        .stage(FilterStage::new("ad_alt", |row: &Vec<String>| {
            let value: u32 = row[ad_alt]
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid AD_alt {:?}: {}", &row[ad_alt], e))?;
            Ok(Verdict::from(value >= thresholds.min_ad_alt))
        }))
        .stage(FilterStage::new("vaf_alt", |row: &Vec<String>| {
            let value: f64 = row[vaf_alt]
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid VAF_alt {:?}: {}", &row[vaf_alt], e))?;
            Ok(Verdict::from(value <= thresholds.max_vaf_alt))
        }))
        .stage(FilterStage::keep_if("coding", |row: &Vec<String>| {
            !row[prot_pos].is_empty()
        }))
        .stage(FilterStage::keep_if("consequence", |row: &Vec<String>| {
            thresholds
                .consequences
                .iter()
                .any(|term| row[consequence].contains(term.as_str()))
        }))
        .apply(rows)?;

    Ok((Table { header, rows }, report))
}

/// Load the expected header, from `path` if given.
fn load_schema(path: Option<&Path>) -> Result<Vec<String>, anyhow::Error> {
    match path {
        Some(path) => Ok(Table::from_path(path)?.header),
        None => Ok(CANONICAL_COLUMNS.iter().map(|s| s.to_string()).collect()),
    }
}

/// Aggregate the CH mutations of `paths` into one table.
pub fn aggregate(
    paths: &[PathBuf],
    schema: &[String],
    thresholds: &Thresholds,
) -> Result<Table, anyhow::Error> {
    let mut header = schema.to_vec();
    header.push(PATIENT_COLUMN.to_string());
    let mut result = Table::with_header(&header);

    let mut report = FilterReport::default();
    for path in paths {
        let table = Table::from_path(path)?;
        if table.header != schema {
            let e = SchemaError::HeaderMismatch {
                expected: schema.join(","),
                actual: table.header.join(","),
            };
            anyhow::bail!("unexpected columns in {:?}: {}", path, e);
        }

        let count_in = table.rows.len();
        let (mut table, file_report) = select_mutations(table, thresholds)
            .map_err(|e| anyhow::anyhow!("problem filtering {:?}: {}", path, e))?;
        tracing::debug!(
            "{:?}: kept {} of {} rows",
            path,
            table.rows.len().separate_with_commas(),
            count_in.separate_with_commas()
        );
        report.extend(file_report);

        table.push_column(PATIENT_COLUMN, &patient_id(path)?);
        result.append(table)?;
    }

    report.log("seqvars aggregate");
    Ok(result)
}

/// Main entry point for `seqvars aggregate` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let paths = list_inputs(&args.path_input, &args.input_suffix)?;
    let selected = select_slice(&paths, args.first_file, args.last_file)?;
    tracing::info!(
        "aggregating {} of {} files",
        selected.len().separate_with_commas(),
        paths.len().separate_with_commas()
    );
    tracing::debug!("selected files: {:?}", selected);

    let schema = load_schema(args.path_schema_reference.as_deref())?;
    let table = aggregate(selected, &schema, &Thresholds::from(args))?;
    tracing::info!(
        "... found {} CH mutations",
        table.rows.len().separate_with_commas()
    );

    std::fs::create_dir_all(&args.path_output_dir)
        .map_err(|e| anyhow::anyhow!("could not create {:?}: {}", &args.path_output_dir, e))?;
    let path_output = args.path_output_dir.join(args.output_file_name());
    table.write_path(&path_output)?;
    tracing::info!("wrote output to {:?}", &path_output);

    common::trace_rss_now();
    tracing::info!(
        "All of `seqvars aggregate` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;

    use super::{patient_id, select_mutations, select_slice, Args, Thresholds};
    use crate::common::table::Table;

    fn args(tmpdir: &Path, first_file: usize, last_file: usize) -> Args {
        Args {
            path_input: "tests/seqvars/aggregate".into(),
            input_suffix: ".maf.vep2.gz".into(),
            first_file,
            last_file,
            path_output_dir: tmpdir.to_path_buf(),
            path_schema_reference: None,
            min_ad_alt: 2,
            max_vaf_alt: 0.3333,
            consequences: super::DEFAULT_CONSEQUENCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    #[test]
    fn patient_from_file_name() -> Result<(), anyhow::Error> {
        assert_eq!(
            patient_id(Path::new("/data/1234567_23161_0_0_ch.maf.vep2.gz"))?,
            "1234567"
        );
        assert_eq!(patient_id(Path::new("sample.maf.vep2.gz"))?, "sample.maf.vep2.gz");

        Ok(())
    }

    #[rstest::rstest]
    #[case(0, 2, vec!["a", "b"])]
    #[case(1, 10, vec!["b", "c"])]
    #[case(5, 10, vec![])]
    #[case(1, 1, vec![])]
    fn slice_is_clamped(#[case] first: usize, #[case] last: usize, #[case] expected: Vec<&str>) -> Result<(), anyhow::Error> {
        let paths = ["a", "b", "c"].iter().map(PathBuf::from).collect::<Vec<_>>();
        let expected = expected.iter().map(PathBuf::from).collect::<Vec<_>>();

        assert_eq!(select_slice(&paths, first, last)?, expected.as_slice());

        Ok(())
    }

    #[test]
    fn slice_first_after_last_is_error() {
        assert!(select_slice(&[], 3, 2).is_err());
    }

    #[test]
    fn listing_is_sorted_and_filtered() -> Result<(), anyhow::Error> {
        let paths = super::list_inputs("tests/seqvars/aggregate", ".maf.vep2.gz")?;

        assert_eq!(
            paths
                .iter()
                .filter_map(|p| p.file_name().and_then(|s| s.to_str()))
                .collect::<Vec<_>>(),
            vec![
                "1000001_23161_0_0_ch.maf.vep2.gz",
                "1000002_23161_0_0_ch.maf.vep2.gz",
                "1000003_23161_0_0_ch.maf.vep2.gz",
            ]
        );

        Ok(())
    }

    #[test]
    fn listing_from_file() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_list = tmpdir.join("files.txt");
        std::fs::write(&path_list, "b/2_x.gz\n\na/1_x.gz\n")?;

        let paths = super::list_inputs(&format!("@{}", path_list.display()), ".gz")?;

        assert_eq!(
            paths,
            vec![PathBuf::from("a/1_x.gz"), PathBuf::from("b/2_x.gz")]
        );

        Ok(())
    }

    #[test]
    fn thresholds() -> Result<(), anyhow::Error> {
        let mut table = Table::with_header(&["AD_alt", "VAF_alt", "Prot_pos", "Consequence"]);
        for row in [
            ["3", "0.1", "882", "missense_variant"],
            ["1", "0.1", "882", "missense_variant"],
            ["3", "0.5", "882", "missense_variant"],
            ["3", "0.1", "", "splice_region_variant&intron_variant"],
            ["3", "0.1", "12", "synonymous_variant"],
            ["2", "0.3333", "735", "splice_region_variant&synonymous_variant"],
            ["3", "0.1", "882", "Missense_variant"],
        ] {
            table.rows.push(row.iter().map(|s| s.to_string()).collect());
        }

        let (table, report) = select_mutations(table, &Thresholds::default())?;

        assert_eq!(report.dropped("ad_alt"), 1);
        assert_eq!(report.dropped("vaf_alt"), 1);
        assert_eq!(report.dropped("coding"), 1);
        assert_eq!(report.dropped("consequence"), 2);
        assert_eq!(
            table.rows.iter().map(|r| r[2].as_str()).collect::<Vec<_>>(),
            vec!["882", "735"]
        );

        Ok(())
    }

    #[test]
    fn invalid_depth_is_error() {
        let mut table = Table::with_header(&["AD_alt", "VAF_alt", "Prot_pos", "Consequence"]);
        table.rows.push(
            ["x", "0.1", "882", "missense_variant"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        assert!(select_mutations(table, &Thresholds::default()).is_err());
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let args = args(&tmpdir, 0, 10);

        super::run(&Default::default(), &args)?;

        let table = Table::from_path(tmpdir.join("CHmutations_0_10.txt.gz"))?;
        assert_eq!(table.header.last().map(|s| s.as_str()), Some("patient"));
        let symbol = table.column("SYMBOL")?;
        let patient = table.column("patient")?;
        assert_eq!(
            table
                .rows
                .iter()
                .map(|r| (r[patient].as_str(), r[symbol].as_str()))
                .collect::<Vec<_>>(),
            vec![("1000001", "DNMT3A"), ("1000003", "TET2"), ("1000003", "ASXL1")]
        );

        Ok(())
    }

    #[test]
    fn run_is_idempotent() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let args = args(&tmpdir, 1, 3);
        let path_output = tmpdir.join("CHmutations_1_3.txt.gz");

        super::run(&Default::default(), &args)?;
        let first = std::fs::read(&path_output)?;
        super::run(&Default::default(), &args)?;
        let second = std::fs::read(&path_output)?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn empty_slice_writes_header() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let args = args(&tmpdir, 3, 5);

        super::run(&Default::default(), &args)?;

        let table = Table::from_path(tmpdir.join("CHmutations_3_5.txt.gz"))?;
        assert_eq!(table.header.len(), crate::seqvars::schema::CANONICAL_COLUMNS.len() + 1);
        assert!(table.rows.is_empty());

        Ok(())
    }

    #[test]
    fn schema_mismatch_is_error() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_schema = tmpdir.join("schema.tsv");
        std::fs::write(&path_schema, "#CHROM\tPOS\tAD_alt\n")?;
        let args = Args {
            path_schema_reference: Some(path_schema),
            ..args(&tmpdir, 0, 1)
        };

        assert!(super::run(&Default::default(), &args).is_err());

        Ok(())
    }
}
