//! Invocation of the external variant effect annotator.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::{common::GenomeRelease, err::AnnotatorError};

/// Annotates a variant file, writing the result to a new file.
pub trait Annotator {
    /// Annotate `path_in` and write the result to `path_out`.
    fn annotate(&self, path_in: &Path, path_out: &Path) -> Result<(), AnnotatorError>;
}

/// Configuration of the VEP invocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Program and leading arguments, e.g., `["singularity", "exec", "vep.simg", "vep"]`.
    pub command: Vec<String>,
    /// Genome assembly passed as `--assembly`.
    pub assembly: GenomeRelease,
    /// Offline cache directory passed as `--dir`.
    pub path_cache: Option<PathBuf>,
    /// Further flags.
    pub flags: Vec<String>,
    /// Whether to gzip-compress the output.
    pub compress_output: bool,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            command: vec!["vep".to_string()],
            assembly: GenomeRelease::Grch38,
            path_cache: None,
            flags: [
                "--no_stats",
                "--cache",
                "--offline",
                "--symbol",
                "--protein",
                "--vcf",
                "--canonical",
                "--af_gnomad",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            compress_output: true,
        }
    }
}

impl AnnotatorConfig {
    /// Load configuration from a JSON file; missing keys take their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            anyhow::anyhow!(
                "failed to open annotator config {:?}: {}",
                path.as_ref(),
                e
            )
        })?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("failed to parse annotator config: {}", e))
    }
}

/// Runs Ensembl VEP as a subprocess.
#[derive(Debug, Clone)]
pub struct Vep {
    pub config: AnnotatorConfig,
}

impl Vep {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self { config }
    }

    /// Build the command line for annotating `path_in` into `path_out`.
    pub fn command(&self, path_in: &Path, path_out: &Path) -> Result<Command, AnnotatorError> {
        let (program, prefix_args) = self
            .config
            .command
            .split_first()
            .ok_or(AnnotatorError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(prefix_args)
            .arg("-i")
            .arg(path_in)
            .arg("-o")
            .arg(path_out)
            .arg("--assembly")
            .arg(self.config.assembly.to_string())
            .args(&self.config.flags);
        if let Some(path_cache) = &self.config.path_cache {
            command.arg("--dir").arg(path_cache);
        }
        if self.config.compress_output {
            command.args(["--compress_output", "gzip"]);
        }
        Ok(command)
    }
}

impl Annotator for Vep {
    fn annotate(&self, path_in: &Path, path_out: &Path) -> Result<(), AnnotatorError> {
        let mut command = self.command(path_in, path_out)?;
        tracing::info!("running annotator: {:?}", &command);

        let output = command.output().map_err(|source| AnnotatorError::Spawn {
            program: command.get_program().to_string_lossy().to_string(),
            source,
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            tracing::debug!("annotator stderr: {}", &stderr);
        }

        if !output.status.success() {
            return Err(AnnotatorError::Failed {
                status: output.status,
                stderr,
            });
        }
        if !path_out.exists() {
            return Err(AnnotatorError::MissingOutput(path_out.to_path_buf()));
        }
        Ok(())
    }
}
