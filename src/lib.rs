//! filesift - find files by type, group duplicates, act on them, report.
//!
//! A scan walks one directory tree for files with a given suffix, optionally
//! gathers them into a folder, groups duplicates by file name or SHA-256,
//! prunes every duplicate but the first of each group, and writes a CSV or
//! HTML report. [`orchestrator::ScanOrchestrator`] drives the whole
//! pipeline; [`run_app`] is the command-line front end around it.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bytesize::ByteSize;
use chrono::{DateTime, Local};
use yansi::Paint;

use crate::cli::{Cli, Commands, ConfigArgs, ScanArgs};
use crate::config::{Config, ConfigError};
use crate::error::ExitCode;
use crate::logging::{init_logging, LogOptions};
use crate::orchestrator::{ScanConfig, ScanFailure, ScanOrchestrator, ScanResult};
use crate::progress::Progress;

/// Warnings listed individually in the summary before eliding the rest.
const SUMMARY_WARNING_LIMIT: usize = 10;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for failures that prevent the command from completing.
/// Use [`exit_code_for`] to map it to a process exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    init_logging(LogOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_color: cli.no_color,
    });
    if cli.no_color {
        yansi::disable();
    }

    match &cli.command {
        Commands::Scan(args) => run_scan(args, cli.config.as_deref(), cli.quiet),
        Commands::Config(args) => run_config(args, cli.config.as_deref()),
    }
}

/// Merge settings and command-line flags into a scan request.
///
/// Flags given on the command line win over settings.
#[must_use]
pub fn build_scan_config(args: &ScanArgs, settings: &Config) -> ScanConfig {
    let mut scan = settings
        .apply_to(ScanConfig::new(args.root.clone(), args.suffix.clone()))
        .with_copy(args.copy)
        .with_detect_duplicates(args.detect_duplicates)
        .with_content_hash(args.content_hash)
        .with_delete_duplicates(args.delete_duplicates);

    if let Some(format) = args.format {
        scan = scan.with_format(format.into());
    }
    if let Some(threads) = args.io_threads {
        scan = scan.with_io_threads(threads);
    }
    if let Some(collision) = args.collision {
        scan = scan.with_collision_policy(collision.into());
    }
    if let Some(method) = args.delete_method() {
        scan = scan.with_delete_method(method);
    }
    if args.follow_symlinks {
        scan = scan.with_follow_symlinks(true);
    }
    if let Some(report) = &args.report {
        scan = scan.with_report_path(report.clone());
    }
    if let Some(order) = args.sort {
        scan = scan.with_listing_order(order.into());
    }
    scan
}

/// Map an error returned by [`run_app`] to an exit code.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if let Some(failure) = err.downcast_ref::<ScanFailure>() {
        return match failure {
            ScanFailure::InvalidInput(_) => ExitCode::InvalidInput,
            ScanFailure::Interrupted { .. } => ExitCode::Interrupted,
            ScanFailure::Report { .. } => ExitCode::GeneralError,
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return ExitCode::InvalidInput;
    }
    ExitCode::GeneralError
}

fn run_scan(args: &ScanArgs, config_path: Option<&Path>, quiet: bool) -> anyhow::Result<ExitCode> {
    let settings = Config::load(config_path).context("Failed to load settings")?;
    let scan_config = build_scan_config(args, &settings);
    log::debug!("Scan request: {:?}", scan_config);

    let token = signal::install_handler()?;
    let mut orchestrator = ScanOrchestrator::new(scan_config).with_shutdown_flag(token.flag());
    if !quiet {
        orchestrator = orchestrator.with_progress(Arc::new(Progress::new(false)));
    }

    match orchestrator.run() {
        Ok(result) => {
            if !quiet {
                write_summary(&mut io::stdout().lock(), &result)?;
            }
            if result.has_warnings() {
                Ok(ExitCode::PartialSuccess)
            } else {
                Ok(ExitCode::Success)
            }
        }
        Err(failure) => {
            if let Some(partial) = failure.partial() {
                if !quiet {
                    write_summary(&mut io::stdout().lock(), partial)?;
                }
            }
            Err(failure.into())
        }
    }
}

fn run_config(args: &ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    if args.init {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => Config::default_path().ok_or(ConfigError::NoConfigDir)?,
        };
        if path.exists() {
            log::info!("Config file already exists: {}", path.display());
        } else {
            Config::default().save(&path)?;
            println!("Created {}", path.display());
        }
    }

    let settings = Config::load(config_path)?;
    print!("{}", settings.to_toml()?);
    Ok(ExitCode::Success)
}

/// Write the human-readable end-of-run summary.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_summary<W: Write>(out: &mut W, result: &ScanResult) -> io::Result<()> {
    writeln!(
        out,
        "{} {} in {:.2?} ({})",
        "Scanned".bold(),
        result.root.display(),
        result.duration,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(
        out,
        "  Matched files:    {} ({})",
        result.files.len().bold(),
        ByteSize::b(result.total_size())
    )?;
    if let Some((oldest, newest)) = result.created_range() {
        writeln!(
            out,
            "  Created:          {} to {}",
            DateTime::<Local>::from(oldest).format("%Y-%m-%d %H:%M:%S"),
            DateTime::<Local>::from(newest).format("%Y-%m-%d %H:%M:%S")
        )?;
    }

    if result.duplicate_detection {
        writeln!(
            out,
            "  Duplicate groups: {} ({} extra files, {} reclaimable)",
            result.stats.duplicate_groups.bold(),
            result.stats.duplicate_files,
            ByteSize::b(result.stats.reclaimable_space)
        )?;
    }
    if let Some(dir) = &result.copy_dir {
        writeln!(
            out,
            "  Copied:           {} -> {}",
            result.copied_count.green(),
            dir.display()
        )?;
    }
    if !result.deletions.is_empty() || result.deleted_count > 0 {
        writeln!(
            out,
            "  Deleted:          {} ({} freed)",
            result.deleted_count.red(),
            ByteSize::b(result.bytes_freed)
        )?;
    }
    if let Some(report) = &result.report_path {
        writeln!(out, "  Report:           {}", report.display().cyan())?;
    }

    if result.has_warnings() {
        writeln!(out, "  Warnings:         {}", result.warnings.len().yellow())?;
        for warning in result.warnings.iter().take(SUMMARY_WARNING_LIMIT) {
            writeln!(out, "    {}", warning.yellow())?;
        }
        let hidden = result.warnings.len().saturating_sub(SUMMARY_WARNING_LIMIT);
        if hidden > 0 {
            writeln!(out, "    ... and {hidden} more (run with -v for details)")?;
        }
    }
    Ok(())
}
