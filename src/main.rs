use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use wikirestore::config::FilterConfig;
use wikirestore::pipeline::{self, RestoreOptions};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wikirestore")]
#[command(about = "Rebuild a per-page file tree from a MediaWiki mysqldump --xml export")]
struct Cli {
    /// Path to the database dump (.xml or .xml.bz2)
    input: String,

    /// Output directory for category folders and page files
    output: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML file with blacklisted titles, spam keywords and spam domain patterns
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dry run - report what would be written without touching the output directory
    #[arg(long)]
    dry_run: bool,

    /// Write run statistics as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<()> {
    let filter = match &cli.config {
        Some(path) => FilterConfig::load(path)
            .with_context(|| format!("Failed to load filter config: {}", path.display()))?,
        None => FilterConfig::default(),
    };

    let options = RestoreOptions {
        input: cli.input,
        output: cli.output,
        filter,
        dry_run: cli.dry_run,
    };

    let start = Instant::now();
    let stats = pipeline::run_restore(&options)?;
    let report = stats.to_report();

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        info!(path = ?path, "Report written");
    }

    println!();
    println!("=== Summary ===");
    println!("Total time:          {:.2}s", start.elapsed().as_secs_f64());
    println!();
    println!("Rows admitted:       {}", report.rows_admitted);
    println!("Rows blacklisted:    {}", report.rows_blacklisted);
    println!("Rows malformed:      {}", report.rows_malformed);
    println!("Links resolved:      {}", report.links_resolved);
    println!("Links skipped:       {}", report.links_unresolved);
    println!("Memberships:         {}", report.memberships_resolved);
    println!("Memberships skipped: {}", report.memberships_unresolved);
    println!("Files written:       {}", report.files_written);
    println!("Files existing:      {}", report.files_existing);
    println!("Pages without text:  {}", report.pages_without_text);
    println!("Pages not saved:     {}", report.pages_unsavable);

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    match run(cli) {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
