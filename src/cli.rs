//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use refstyle_core::Brackets;
use refstyle_core::style::CrossrefMatch;

/// Reformat bibliographic reference lists.
///
/// Refstyle parses free-form references (authors, year, title, journal,
/// volume, pages, DOI) and rewrites them in a configurable citation style.
#[derive(Parser, Debug)]
#[command(name = "refstyle")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ignore every configuration file
    #[arg(long, global = true, conflicts_with = "config")]
    pub no_config: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse and reformat references in one pass
    Format(FormatArgs),

    /// Write bracket-annotated references for manual review
    Annotate(AnnotateArgs),

    /// Format a reviewed annotated file
    Apply(ApplyArgs),

    /// Show the effective configuration
    Config,
}

/// Input and output files.
#[derive(Args, Debug, Clone, Default)]
pub struct IoArgs {
    /// Input file (reads stdin when omitted)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output file (writes stdout when omitted)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Journal name recognition.
#[derive(Args, Debug, Clone, Default)]
pub struct JournalArgs {
    /// Tab-separated journal name table replacing the bundled one
    #[arg(long, value_name = "PATH")]
    pub journal_table: Option<PathBuf>,

    /// Do not recognize journal names
    #[arg(long, conflicts_with = "journal_table")]
    pub no_journals: bool,
}

/// Style option overrides and DOI retrieval.
#[derive(Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Set a style option, e.g. `-s year_format=paren-period` (repeatable)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Retrieve missing DOIs from Crossref
    #[arg(long, value_name = "MODE")]
    pub crossref: Option<CrossrefMatch>,

    /// Contact address sent to Crossref (polite pool)
    #[arg(long, value_name = "EMAIL")]
    pub mailto: Option<String>,

    /// Minimum title similarity in percent for fuzzy DOI matches (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub fuzzy_threshold: Option<u8>,

    /// Maximum concurrent DOI lookups (1-16)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub lookup_concurrency: Option<u8>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatArgs {
    #[command(flatten)]
    pub io: IoArgs,

    #[command(flatten)]
    pub journals: JournalArgs,

    #[command(flatten)]
    pub style: StyleArgs,

    /// Treat the input as an HTML document regardless of its extension
    #[arg(long)]
    pub html: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct AnnotateArgs {
    #[command(flatten)]
    pub io: IoArgs,

    #[command(flatten)]
    pub journals: JournalArgs,

    /// Two bracket characters delimiting fields (default "{}")
    #[arg(long, value_name = "PAIR")]
    pub brackets: Option<Brackets>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub io: IoArgs,

    #[command(flatten)]
    pub journals: JournalArgs,

    #[command(flatten)]
    pub style: StyleArgs,

    /// Two bracket characters delimiting fields (default "{}")
    #[arg(long, value_name = "PAIR")]
    pub brackets: Option<Brackets>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
