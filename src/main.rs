use std::fs;
use std::path::PathBuf;

use cashbook::session;
use cashbook::store::Dataset;
use cashbook::{LedgerError, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = init_tracing().and_then(|_| run(Cli::parse())) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|error| LedgerError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Import(args) => execute_import(args),
        Command::Export(args) => execute_export(args),
        Command::History(args) => execute_history(args),
    }
}

fn execute_import(args: ImportArgs) -> Result<()> {
    if !args.file.exists() {
        return Err(LedgerError::MissingInput(args.file));
    }
    let bytes = fs::read(&args.file)?;
    let source_filename = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut dataset = Dataset::load(&args.store)?;
    let result = session::import_workbook(
        &mut dataset,
        &args.owner,
        &source_filename,
        &bytes,
        args.overwrite,
        Utc::now(),
    );
    // The audit entry is persisted even when the call itself failed.
    dataset.save(&args.store)?;
    let entry = result?;

    println!(
        "{}: {} created, {} updated, {} skipped, {} failed",
        entry.status,
        entry.created_count,
        entry.updated_count,
        entry.skipped_count,
        entry.failed_count
    );
    for detail in &entry.error_detail {
        eprintln!("  {detail}");
    }
    Ok(())
}

fn execute_export(args: ExportArgs) -> Result<()> {
    let mut dataset = Dataset::load(&args.store)?;
    let backup = session::export_backup(&mut dataset, &args.owner, Utc::now())?;

    let output_path = args.out_dir.join(&backup.filename);
    fs::write(&output_path, &backup.bytes)?;
    dataset.save(&args.store)?;

    println!("{}", output_path.display());
    Ok(())
}

fn execute_history(args: HistoryArgs) -> Result<()> {
    let dataset = Dataset::load(&args.store)?;
    for entry in dataset.import_history(&args.owner) {
        let layout = entry
            .detected_layout
            .map(|layout| layout.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{} {} ({layout}) {}: {} created, {} updated, {} skipped, {} failed",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.source_filename,
            entry.status,
            entry.created_count,
            entry.updated_count,
            entry.skipped_count,
            entry.failed_count
        );
        for detail in &entry.error_detail {
            println!("    {detail}");
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Import, reconcile, and export personal-finance workbooks."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a workbook (modern backup or legacy yearly) for an owner.
    Import(ImportArgs),
    /// Export an owner's full dataset as a modern backup workbook.
    Export(ExportArgs),
    /// Show an owner's import audit history, newest first.
    History(HistoryArgs),
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Path of the JSON ledger store.
    #[arg(long, default_value = "ledger.json")]
    store: PathBuf,

    /// Owner whose records are imported.
    #[arg(long)]
    owner: String,

    /// Workbook file to import.
    #[arg(long)]
    file: PathBuf,

    /// Replace conflicting transactions instead of skipping them.
    #[arg(long)]
    overwrite: bool,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Path of the JSON ledger store.
    #[arg(long, default_value = "ledger.json")]
    store: PathBuf,

    /// Owner whose dataset is exported.
    #[arg(long)]
    owner: String,

    /// Directory the backup workbook is written into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(clap::Args)]
struct HistoryArgs {
    /// Path of the JSON ledger store.
    #[arg(long, default_value = "ledger.json")]
    store: PathBuf,

    /// Owner whose import attempts are listed.
    #[arg(long)]
    owner: String,
}
