use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Import from our modularized library
use dup_file_finder_rs::logging::init_logging;
use dup_file_finder_rs::prelude::*;
use dup_file_finder_rs::report_writer::render_findings;

/// Exit status when the scan was stopped with Ctrl-C
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "dup_file_finder_rs")]
#[command(about = "Find duplicate files by content and flag files whose content contradicts their extension", long_about = None)]
struct Cli {
    /// Directory to scan
    #[arg(required_unless_present = "list_formats")]
    directory: Option<PathBuf>,

    /// File extension to look for (e.g. "txt" or ".PDF")
    #[arg(required_unless_present = "list_formats")]
    extension: Option<String>,

    /// Report format: table, csv or json
    #[arg(short, long, default_value = "table")]
    format: ReportFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel hashing threads (default: sequential)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Follow symbolic links (each file is still hashed once)
    #[arg(long)]
    follow_links: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    skip_hidden: bool,

    /// Do not cross-check file contents against their extension
    #[arg(long)]
    no_signature_check: bool,

    /// List the extensions the signature check can confirm, then exit
    #[arg(long)]
    list_formats: bool,

    /// Run in batch mode (no progress bar)
    #[arg(long)]
    batch: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if cli.list_formats {
        let known: Vec<_> = SignatureTable::builtin().known_extensions().into_iter().collect();
        println!("Known extensions:");
        for line in known.chunks(12) {
            println!("  {}", line.join(", "));
        }
        return Ok(());
    }

    let (Some(directory), Some(extension)) = (cli.directory.as_ref(), cli.extension.as_ref()) else {
        anyhow::bail!("A directory and an extension are required");
    };

    // Set up graceful shutdown handler
    let shutdown_requested = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown_requested.clone();

    ctrlc::set_handler(move || {
        eprintln!("\n⚠️  Shutdown requested. Finishing current files...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    let target = ScanTarget::new(directory, extension).context("Cannot start scan")?;
    let config = ScanConfig::new(target)
        .with_workers(cli.workers)
        .with_follow_links(cli.follow_links)
        .with_skip_hidden(cli.skip_hidden)
        .with_signature_check(!cli.no_signature_check);

    let extension = config.target.extension().to_string();
    if config.check_signatures && !config.signatures.knows_extension(&extension) {
        log::info!(
            "No signature registered for '{}'; only other recognized formats will be flagged",
            extension
        );
    }

    // CSV or JSON on stdout must not be mixed with console chatter
    let machine_stdout = cli.output.is_none() && cli.format != ReportFormat::Table;

    if !machine_stdout {
        println!("Duplicate File Finder (Rust Edition)");
        println!(
            "Scanning {} for '{}' files",
            config.target.root().display(),
            extension
        );
        println!();
    }

    // Set up progress bar (skip in batch mode)
    let progress = if cli.batch || cli.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        pb
    };

    let report = Scanner::new(config)
        .with_shutdown_flag(shutdown_requested.clone())
        .with_progress(progress)
        .run();

    if report.interrupted {
        eprintln!("\n⏹️  Graceful shutdown complete");
        eprintln!(
            "📊 Processed {} file(s) before stopping; no report written",
            report.files_considered
        );
        std::process::exit(EXIT_INTERRUPTED);
    }

    match &cli.output {
        Some(output) => {
            write_report(output, &report, cli.format)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
            if cli.format != ReportFormat::Table {
                print!("{}", render_findings(&report));
            }
            println!("Detailed report saved to: {}", output.display());
        }
        None => {
            print!("{}", render(&report, cli.format)?);
            if cli.format != ReportFormat::Table {
                // Keep machine-readable stdout clean
                eprint!("{}", render_findings(&report));
            }
        }
    }

    if machine_stdout {
        return Ok(());
    }

    // Print summary
    println!();
    println!("==================================================");
    println!("SCAN COMPLETE");
    println!("==================================================");
    println!("Files considered: {}", report.files_considered);
    println!(
        "Unique file hashes: {} of {}",
        report.unique_digests, report.files_considered
    );
    println!("Duplicate groups: {}", report.duplicates.len());
    println!("Signature mismatches: {}", report.suspects.len());
    println!("Unreadable files: {}", report.read_error_count());
    if report.enumeration_error_count() > 0 {
        println!("Skipped entries: {}", report.enumeration_error_count());
    }
    if report.duplicates.is_empty() {
        println!("No duplicates found.");
    }

    Ok(())
}
