//! CH variants worker main executable

pub mod common;
pub mod err;
pub mod seqvars;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clonal hematopoiesis variant calling",
    long_about = "This tool identifies clonal hematopoiesis mutations in per-sample gVCF files"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Sequence variant related commands.
    Seqvars(Seqvars),
}

/// Parsing of "seqvars *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Seqvars {
    /// The sub command to run
    #[command(subcommand)]
    command: SeqvarsCommands,
}

/// Enum supporting the parsing of "seqvars *" sub commands.
#[derive(Debug, Subcommand)]
enum SeqvarsCommands {
    Extract(seqvars::extract::Args),
    Prefilter(seqvars::prefilter::Args),
    Canonical(seqvars::canonical::Args),
    Aggregate(seqvars::aggregate::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Seqvars(seqvars) => match &seqvars.command {
                SeqvarsCommands::Extract(args) => {
                    seqvars::extract::run(&cli.common, args)?;
                }
                SeqvarsCommands::Prefilter(args) => {
                    seqvars::prefilter::run(&cli.common, args)?;
                }
                SeqvarsCommands::Canonical(args) => {
                    seqvars::canonical::run(&cli.common, args)?;
                }
                SeqvarsCommands::Aggregate(args) => {
                    seqvars::aggregate::run(&cli.common, args)?;
                }
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
