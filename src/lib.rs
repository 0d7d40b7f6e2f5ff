//! RustSums - checksum manifests and hash collision disambiguation
//!
//! Generates and verifies `<ALGO>SUMS` manifests for a flat directory and
//! tells files that share a checksum apart: byte-identical duplicates versus
//! genuine hash collisions, reading as few bytes as possible.

pub mod actions;
pub mod cli;
pub mod collisions;
pub mod config;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod manifest;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::actions::{
    dedup_clusters, find_collisions, generate, report_exit_code, verify, DedupOptions,
    GenerateOptions, RemovalMode,
};
use crate::cli::{
    Cli, CollisionsArgs, Commands, DedupArgs, GenerateArgs, OutputFormat, VerifyArgs,
};
use crate::collisions::{CollisionReport, FinderConfig};
use crate::config::{ColorChoice, Config};
use crate::error::ExitCode;
use crate::hashing::{HashAlgorithm, Hasher};
use crate::manifest::{load_manifest, locate_manifest, Manifest, ParseMode};
use crate::output::{JsonOutput, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::signal::ShutdownHandler;

/// Everything a command needs besides its own arguments.
struct AppContext {
    config: Config,
    shutdown: ShutdownHandler,
    progress: Arc<dyn ProgressCallback>,
    color: bool,
}

/// Run the command described by `cli` on the process's standard streams.
///
/// # Errors
///
/// Returns an error when the command cannot run at all (bad configuration,
/// missing manifest, unknown algorithm, I/O failure). Per-file problems are
/// reported through the returned [`ExitCode`].
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_app_with_io(cli, &mut stdin.lock(), &mut stdout.lock())
}

/// Run the command described by `cli`, prompting on `input` and writing
/// reports to `output`.
///
/// # Errors
///
/// See [`run_app`].
pub fn run_app_with_io<R: BufRead, W: Write>(
    cli: Cli,
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log::debug!("Configuration: {:?}", config);

    let color = !cli.no_color
        && match config.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        };

    let shutdown = signal::install_handler();
    let progress: Arc<dyn ProgressCallback> =
        Arc::new(Progress::new(cli.quiet || !io::stderr().is_terminal()));

    let ctx = AppContext {
        config,
        shutdown,
        progress,
        color,
    };

    match cli.command {
        Commands::Generate(args) => run_generate(&ctx, &args, output),
        Commands::Verify(args) => run_verify(&ctx, &args),
        Commands::Collisions(args) => run_collisions(&ctx, &args, output),
        Commands::Dedup(args) => run_dedup(&ctx, &args, input, output),
    }
}

impl AppContext {
    fn hasher(&self) -> Hasher {
        Hasher::new().with_shutdown_flag(self.shutdown.get_flag())
    }

    fn parse_mode(&self, strict: bool) -> ParseMode {
        if strict {
            ParseMode::Strict
        } else {
            self.config.parse_mode
        }
    }

    fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_io_threads(self.config.io_threads)
            .with_chunk_size(self.config.chunk_size)
            .with_max_bytes_read(self.config.max_bytes_read)
            .with_shutdown_flag(self.shutdown.get_flag())
            .with_progress_callback(Arc::clone(&self.progress))
    }

    fn load(
        &self,
        dir: &Path,
        algorithm: Option<&HashAlgorithm>,
        strict: bool,
    ) -> anyhow::Result<(HashAlgorithm, Manifest)> {
        let (algorithm, path) = locate_manifest(dir, algorithm)?;
        let manifest = load_manifest(&path, self.parse_mode(strict))
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if !manifest.skipped.is_empty() {
            log::warn!(
                "Skipped {} malformed line(s) in {}",
                manifest.skipped.len(),
                path.display()
            );
        }
        log::info!("Loaded {} record(s) from {}", manifest.len(), path.display());
        Ok((algorithm, manifest))
    }

    fn analyze(
        &self,
        dir: &Path,
        algorithm: Option<&HashAlgorithm>,
        strict: bool,
    ) -> anyhow::Result<CollisionReport> {
        let (_, manifest) = self.load(dir, algorithm, strict)?;
        Ok(find_collisions(dir, &manifest.records, self.finder_config())?)
    }
}

fn run_generate<W: Write>(
    ctx: &AppContext,
    args: &GenerateArgs,
    output: &mut W,
) -> anyhow::Result<ExitCode> {
    let algorithm = args
        .manifest
        .algorithm
        .clone()
        .unwrap_or_else(HashAlgorithm::default_for_generate);
    let options = GenerateOptions::new(algorithm)
        .with_overwrite(args.force)
        .with_io_threads(ctx.config.io_threads)
        .with_progress_callback(Arc::clone(&ctx.progress));

    let summary = generate(&args.manifest.dir, &options, &ctx.hasher())?;
    writeln!(
        output,
        "Wrote {} record(s) to {}",
        summary.records.len(),
        summary.path.display()
    )?;
    Ok(ExitCode::Success)
}

fn run_verify(ctx: &AppContext, args: &VerifyArgs) -> anyhow::Result<ExitCode> {
    let dir = &args.manifest.dir;
    let (algorithm, manifest) = ctx.load(dir, args.manifest.algorithm.as_ref(), args.strict)?;

    let report = verify(
        dir,
        &manifest.records,
        &algorithm,
        &ctx.hasher(),
        ctx.config.io_threads,
        Some(&ctx.progress),
    )?;

    if !args.silent {
        let mut stderr = io::stderr().lock();
        for failure in &report.failures {
            writeln!(stderr, "{failure}")?;
        }
    }

    Ok(if report.all_match() {
        ExitCode::Success
    } else {
        ExitCode::Failure
    })
}

fn run_collisions<W: Write>(
    ctx: &AppContext,
    args: &CollisionsArgs,
    output: &mut W,
) -> anyhow::Result<ExitCode> {
    let report = ctx.analyze(
        &args.manifest.dir,
        args.manifest.algorithm.as_ref(),
        args.strict,
    )?;
    let exit_code = report_exit_code(&report);

    match args.output {
        OutputFormat::Text => TextOutput::new(&report, ctx.color).write_to(output)?,
        OutputFormat::Json => JsonOutput::new(&report, exit_code).write_to(output, true)?,
    }
    Ok(exit_code)
}

fn run_dedup<R: BufRead, W: Write>(
    ctx: &AppContext,
    args: &DedupArgs,
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<ExitCode> {
    let dir = &args.manifest.dir;
    let report = ctx.analyze(dir, args.manifest.algorithm.as_ref(), args.strict)?;

    let mode = if args.dry_run {
        RemovalMode::DryRun
    } else if args.trash {
        RemovalMode::Trash
    } else {
        RemovalMode::Delete
    };
    let options = DedupOptions::default()
        .with_mode(mode)
        .with_max_attempts(ctx.config.prompt_max_retries);

    let result = dedup_clusters(dir, report.duplicate_clusters(), &options, input, output)?;
    log::info!("{}", result.summary(mode));

    if report.summary.interrupted {
        Ok(ExitCode::Interrupted)
    } else if !result.all_succeeded()
        || report.summary.has_errors()
        || report.summary.budget_exhausted
    {
        Ok(ExitCode::PartialSuccess)
    } else {
        Ok(ExitCode::Success)
    }
}
