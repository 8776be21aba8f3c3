//! Overlap with the CH gene regions from a BED file.

use std::{io::BufRead, path::Path, time::Instant};

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;
use indexmap::IndexMap;
use thousands::Separable;

use crate::common::{io::open_read_maybe_gz, trace_rss_now};

/// Alias for the interval tree that we use.
type IntervalTree = ArrayBackedIntervalTree<i32, u32>;

/// Module with code supporting the parsing.
mod input {
    use serde::Deserialize;

    /// BED3 record; further columns are ignored.
    #[derive(Debug, Deserialize)]
    pub struct Record {
        /// Chromosome name
        pub chromosome: String,
        /// 0-based begin position
        pub begin: i32,
        /// 0-based end position, exclusive
        pub end: i32,
    }
}

/// A gene region, 0-based half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRecord {
    /// 0-based begin position.
    pub begin: i32,
    /// End position.
    pub end: i32,
}

/// Gene regions stored by chromosome name.
#[derive(Debug, Default)]
pub struct RegionDb {
    /// Records, stored by chromosome.
    pub records: IndexMap<String, Vec<RegionRecord>>,
    /// Interval trees, stored by chromosome.
    pub trees: IndexMap<String, IntervalTree>,
}

impl RegionDb {
    /// Build from BED records given as `(chromosome, begin, end)`.
    ///
    /// Zero-length records are widened to one base.
    pub fn from_records<I>(records: I) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = (String, i32, i32)>,
    {
        let mut result = RegionDb::default();
        for (chromosome, begin, end) in records {
            if end < begin {
                anyhow::bail!(
                    "invalid region {}:{}-{}, end before begin",
                    &chromosome,
                    begin,
                    end
                );
            }
            let end = if end == begin { end + 1 } else { end };
            let chrom_records = result.records.entry(chromosome.clone()).or_default();
            let tree = result.trees.entry(chromosome).or_insert_with(IntervalTree::new);
            tree.insert(begin..end, chrom_records.len() as u32);
            chrom_records.push(RegionRecord { begin, end });
        }
        for tree in result.trees.values_mut() {
            tree.index();
        }
        Ok(result)
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.records.values().map(|r| r.len()).sum()
    }

    /// Whether there are no regions at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the 1-based position `pos` on `chrom` is covered by any region.
    ///
    /// A region `[begin, end)` covers all `pos` with `begin <= pos <= end`.
    pub fn contains(&self, chrom: &str, pos: i32) -> bool {
        self.overlapping(chrom, pos).next().is_some()
    }

    /// Regions that cover the 1-based position `pos` on `chrom`.
    ///
    /// The position is queried as the window `[pos - 1, pos + 1)`, the zero-length
    /// `pos..pos` record widened by one base on each side.
    pub fn overlapping<'a>(
        &'a self,
        chrom: &str,
        pos: i32,
    ) -> impl Iterator<Item = &'a RegionRecord> + 'a {
        let hits = match (self.trees.get(chrom), self.records.get(chrom)) {
            (Some(tree), Some(records)) if pos > 0 => tree
                .find((pos - 1)..(pos + 1))
                .iter()
                .map(|e| &records[*e.data() as usize])
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        hits.into_iter()
    }
}

/// Load gene regions from a BED file, optionally gzip-compressed.
///
/// Lines starting with `#`, `track`, or `browser` are skipped.
#[tracing::instrument]
pub fn load_region_db(path: &Path) -> Result<RegionDb, anyhow::Error> {
    tracing::debug!("loading gene regions from {:?}", path);
    let before_loading = Instant::now();

    let text = {
        let mut text = String::new();
        for line in open_read_maybe_gz(path)
            .map_err(|e| anyhow::anyhow!("could not open BED file {:?}: {}", path, e))?
            .lines()
        {
            let line = line?;
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }
            text.push_str(&line);
            text.push('\n');
        }
        text
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let record: input::Record = record
            .deserialize(None)
            .or_else(|_| {
                // Tolerate additional BED columns.
                let bed3 = csv::StringRecord::from(record.iter().take(3).collect::<Vec<_>>());
                bed3.deserialize(None)
            })
            .map_err(|e| anyhow::anyhow!("invalid BED record {:?}: {}", &record, e))?;
        records.push((record.chromosome, record.begin, record.end));
    }
    let result = RegionDb::from_records(records)?;

    tracing::debug!(
        "total time spent loading {} regions: {:?}",
        result.len().separate_with_commas(),
        before_loading.elapsed()
    );
    trace_rss_now();

    Ok(result)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::RegionDb;

    fn db() -> Result<RegionDb, anyhow::Error> {
        RegionDb::from_records(vec![
            ("chr1".to_string(), 100, 200),
            ("chr1".to_string(), 150, 300),
            ("chr2".to_string(), 10, 10),
        ])
    }

    #[rstest::rstest]
    #[case("chr1", 99, false)]
    #[case("chr1", 100, true)]
    #[case("chr1", 101, true)]
    #[case("chr1", 200, true)]
    #[case("chr1", 300, true)]
    #[case("chr1", 301, false)]
    #[case("chr2", 9, false)]
    #[case("chr2", 10, true)]
    #[case("chr2", 11, true)]
    #[case("chr2", 12, false)]
    #[case("chr3", 150, false)]
    #[case("chr1", 0, false)]
    fn contains(
        #[case] chrom: &str,
        #[case] pos: i32,
        #[case] expected: bool,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(db()?.contains(chrom, pos), expected);

        Ok(())
    }

    #[test]
    fn overlapping_reports_all_regions() -> Result<(), anyhow::Error> {
        let db = db()?;
        assert_eq!(db.overlapping("chr1", 175).count(), 2);
        assert_eq!(db.len(), 3);

        Ok(())
    }

    #[test]
    fn end_before_begin_is_error() {
        assert!(RegionDb::from_records(vec![("chr1".to_string(), 10, 5)]).is_err());
    }

    #[test]
    fn load_bed_file() -> Result<(), anyhow::Error> {
        let db = super::load_region_db(std::path::Path::new("tests/seqvars/extract/ch_genes.bed"))?;

        assert_eq!(db.len(), 3);
        assert!(db.contains("chr2", 25_234_373));
        assert!(db.contains("chr2", 25_227_854));
        assert!(db.contains("chr2", 25_342_590));
        assert!(!db.contains("chr2", 25_342_591));
        assert!(!db.contains("chr2", 25_000_000));

        Ok(())
    }
}
