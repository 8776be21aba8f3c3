//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod filter;
pub mod io;
pub mod table;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let rss = procfs::process::Process::myself()
        .and_then(|me| me.stat())
        .map(|stat| stat.rss * procfs::page_size());
    match rss {
        Ok(rss) => tracing::debug!("RSS now: {}", bytesize::ByteSize::b(rss)),
        Err(e) => tracing::trace!("could not determine RSS: {}", e),
    }
}

/// Select the genome release to use.
#[derive(
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    strum::Display,
    PartialEq,
    Eq,
    Hash,
)]
pub enum GenomeRelease {
    /// GRCh37 / hg19
    #[strum(serialize = "GRCh37")]
    #[serde(rename = "GRCh37", alias = "grch37")]
    Grch37,
    /// GRCh38 / hg38
    #[default]
    #[strum(serialize = "GRCh38")]
    #[serde(rename = "GRCh38", alias = "grch38")]
    Grch38,
}

/// Return the sample stem of `path`, i.e., the file name up to the first dot.
///
/// `/data/1234_23161_0_0.g.vcf.gz` becomes `1234_23161_0_0`.
pub fn sample_stem<P: AsRef<std::path::Path>>(path: P) -> Result<String, anyhow::Error> {
    let file_name = path
        .as_ref()
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("no file name in path {:?}", path.as_ref()))?;
    Ok(file_name
        .split('.')
        .next()
        .unwrap_or(file_name)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case("/data/1234_23161_0_0.g.vcf.gz", "1234_23161_0_0")]
    #[case("1234_23161_0_0_ch.maf.gz", "1234_23161_0_0_ch")]
    #[case("relative/dir/sample", "sample")]
    fn sample_stem_strips_dir_and_ext(
        #[case] path: &str,
        #[case] expected: &str,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(sample_stem(path)?, expected);

        Ok(())
    }

    #[test]
    fn genome_release_names() -> Result<(), anyhow::Error> {
        assert_eq!(GenomeRelease::Grch37.to_string(), "GRCh37");
        assert_eq!(GenomeRelease::Grch38.to_string(), "GRCh38");
        assert_eq!(
            serde_json::from_str::<GenomeRelease>("\"grch37\"")?,
            GenomeRelease::Grch37
        );
        assert_eq!(serde_json::to_string(&GenomeRelease::Grch38)?, "\"GRCh38\"");

        Ok(())
    }
}
