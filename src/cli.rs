//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Write SHA1SUMS for the current directory
//! rustsums generate
//!
//! # Verify against whichever manifest is present
//! rustsums verify -D ~/archive
//!
//! # Tell true duplicates from hash collisions, as JSON
//! rustsums collisions -c md5 --output json
//!
//! # Show what dedup would delete
//! rustsums dedup --dry-run
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::hashing::HashAlgorithm;

/// Checksum manifest tool.
///
/// Generates and verifies `<ALGO>SUMS` files and separates true duplicate
/// files from files that merely share a checksum.
#[derive(Debug, Parser)]
#[command(name = "rustsums")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a checksum file for a directory
    Generate(GenerateArgs),
    /// Verify files against a checksum file
    Verify(VerifyArgs),
    /// Report checksums shared by several files
    Collisions(CollisionsArgs),
    /// Interactively delete byte-identical duplicates
    Dedup(DedupArgs),
}

/// Directory and algorithm selection shared by all subcommands.
#[derive(Debug, Clone, Args)]
pub struct ManifestArgs {
    /// Hash function (MD5, SHA1, SHA512); if unspecified, SHA512SUMS,
    /// SHA1SUMS and MD5SUMS are tried in that order (generate uses SHA1)
    #[arg(short = 'c', long = "hash", value_name = "HASH", value_parser = parse_algorithm)]
    pub algorithm: Option<HashAlgorithm>,

    /// Directory holding the files and the checksum file
    #[arg(short = 'D', long = "dir", value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

/// Arguments for `generate`.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Overwrite an existing checksum file
    #[arg(short = 'f', long)]
    pub force: bool,
}

/// Arguments for `verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Silent; don't report mismatches on stderr
    #[arg(short = 's', long)]
    pub silent: bool,

    /// Abort on malformed checksum lines instead of skipping them
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `collisions`.
#[derive(Debug, Args)]
pub struct CollisionsArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Abort on malformed checksum lines instead of skipping them
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `dedup`.
#[derive(Debug, Args)]
pub struct DedupArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Print what would be deleted without deleting
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Move deleted files to the system trash
    #[arg(long)]
    pub trash: bool,

    /// Abort on malformed checksum lines instead of skipping them
    #[arg(long)]
    pub strict: bool,
}

/// Output format for collision reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a hash function name for `-c`.
///
/// Recognised but unavailable names are rejected here so the user gets a
/// usage error before any file is touched.
///
/// ```
/// use rustsums::cli::parse_algorithm;
/// use rustsums::hashing::HashAlgorithm;
///
/// assert_eq!(parse_algorithm("sha1").unwrap(), HashAlgorithm::Sha1);
/// assert!(parse_algorithm("crc32").is_err());
/// ```
///
/// # Errors
///
/// Returns the algorithm error message for unsupported names.
pub fn parse_algorithm(s: &str) -> Result<HashAlgorithm, String> {
    let algorithm = HashAlgorithm::parse(s);
    algorithm.ensure_supported().map_err(|e| e.to_string())?;
    Ok(algorithm)
}
