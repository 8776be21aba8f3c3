//! Tab-separated tables with VCF-style `##` meta lines.

use std::{
    io::{BufRead, Write},
    path::Path,
};

use crate::err::SchemaError;

use super::io::{open_read_maybe_gz, open_write_maybe_gz};

/// Prefix of meta/comment lines that precede the header line.
pub const META_PREFIX: &str = "##";

/// Build a `csv` reader for tab-separated text without quoting.
pub fn tsv_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .from_reader(reader)
}

/// Build a `csv` writer for tab-separated text that never quotes fields.
pub fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer)
}

/// Read everything from `reader` except the `##` meta lines.
pub fn strip_meta_lines<R: BufRead>(reader: R) -> Result<String, anyhow::Error> {
    let mut result = String::new();
    for line in reader.lines() {
        let line = line?;
        if !line.starts_with(META_PREFIX) {
            result.push_str(&line);
            result.push('\n');
        }
    }
    Ok(result)
}

/// Open `path` (plain or gzip) and return its contents without `##` lines.
pub fn read_without_meta<P: AsRef<Path>>(path: P) -> Result<String, anyhow::Error> {
    let reader = open_read_maybe_gz(path.as_ref()).map_err(|e| {
        anyhow::anyhow!("could not open {:?} for reading: {}", path.as_ref(), e)
    })?;
    strip_meta_lines(reader)
}

/// A table of string cells with a header line.
///
/// Used where the column set is only known at runtime, e.g., the per-sample
/// genotype column of a gVCF or the cohort files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names.
    pub header: Vec<String>,
    /// Rows, each with `header.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn with_header<S: AsRef<str>>(header: &[S]) -> Self {
        Self {
            header: header.iter().map(|s| s.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Parse a table from `reader`, skipping leading `##` lines.
    ///
    /// Ragged rows are an error.
    pub fn read<R: BufRead>(reader: R) -> Result<Self, anyhow::Error> {
        let text = strip_meta_lines(reader)?;
        let mut reader = tsv_reader(text.as_bytes());
        let header = reader
            .headers()
            .map_err(|e| anyhow::anyhow!("problem reading header: {}", e))?
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| anyhow::anyhow!("problem parsing row: {}", e))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(Self { header, rows })
    }

    /// Load a table from the (maybe gzip-compressed) file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let reader = open_read_maybe_gz(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("could not open {:?} for reading: {}", path.as_ref(), e)
        })?;
        Self::read(reader).map_err(|e| anyhow::anyhow!("problem reading {:?}: {}", path.as_ref(), e))
    }

    /// Return index of the column with the given `name`.
    pub fn column(&self, name: &str) -> Result<usize, SchemaError> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))
    }

    /// Append a column named `name` with `value` in every row.
    pub fn push_column(&mut self, name: &str, value: &str) {
        self.header.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(value.to_string());
        }
    }

    /// Append all rows of `other`; the headers must be identical.
    pub fn append(&mut self, other: Table) -> Result<(), SchemaError> {
        if self.header != other.header {
            return Err(SchemaError::HeaderMismatch {
                expected: self.header.join(","),
                actual: other.header.join(","),
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Write header and rows as tab-separated text.
    pub fn write<W: Write>(&self, writer: W) -> Result<(), anyhow::Error> {
        let mut writer = tsv_writer(writer);
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the table to `path`, gzip-compressed if it ends in `.gz`.
    pub fn write_path<P: AsRef<Path>>(&self, path: P) -> Result<(), anyhow::Error> {
        let writer = open_write_maybe_gz(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("could not open {:?} for writing: {}", path.as_ref(), e)
        })?;
        self.write(writer)
    }
}
