use std::{path::PathBuf, process::ExitStatus};

/// Problems with the per-sample genotype column.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GenotypeError {
    #[error("unexpected number of genotype fields: {0}")]
    UnexpectedArity(usize),
    #[error("more genotype values ({values}) than FORMAT keys ({keys})")]
    FormatMismatch { keys: usize, values: usize },
}

/// Problems with the external variant effect annotator.
#[derive(thiserror::Error, Debug)]
pub enum AnnotatorError {
    #[error("annotator command is empty")]
    EmptyCommand,
    #[error("could not run annotator {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("annotator exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("annotator did not write output file {0:?}")]
    MissingOutput(PathBuf),
}

/// Problems with table layouts.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing column: {0}")]
    MissingColumn(String),
    #[error("header mismatch, expected [{expected}] but got [{actual}]")]
    HeaderMismatch { expected: String, actual: String },
}
