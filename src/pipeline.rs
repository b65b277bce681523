use crate::config::FilterConfig;
use crate::filter::ContentFilter;
use crate::join;
use crate::parser::{read_dump, Dump};
use crate::plan;
use crate::sink::FileSink;
use crate::stats::RunStats;
use crate::store::RecordStore;
use anyhow::{Context, Result};
use std::fs;
use std::time::Instant;
use tracing::info;

pub struct RestoreOptions {
    pub input: String,
    pub output: String,
    pub filter: FilterConfig,
    pub dry_run: bool,
}

/// Reads the dump at `options.input` and restores it under `options.output`.
pub fn run_restore(options: &RestoreOptions) -> Result<RunStats> {
    let filter = ContentFilter::new(&options.filter).context("Invalid filter configuration")?;

    let start_reading = Instant::now();
    let mut dump = read_dump(&options.input)
        .with_context(|| format!("Failed to read dump at: {}", options.input))?;
    info!(
        duration_secs = start_reading.elapsed().as_secs_f64(),
        "Dump read"
    );

    restore_dump(&mut dump, &options.output, filter, options.dry_run)
}

/// Load, join, plan and write, in that order. Only loading can fail.
pub fn restore_dump(
    dump: &mut Dump,
    output_dir: &str,
    filter: ContentFilter,
    dry_run: bool,
) -> Result<RunStats> {
    let stats = RunStats::new();

    let mut store = RecordStore::new(filter);
    let reports = store.load_dump(dump).context("Failed to load dump tables")?;
    for report in reports.values() {
        stats.add_load(report);
    }
    info!(
        pages = store.pages().len(),
        categories = store.categories().len(),
        "Tables loaded"
    );

    if !dry_run {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {}", output_dir))?;
    }

    let start_writing = Instant::now();
    let joined = join::resolve(&store, &stats);
    let plan = plan::plan_join(&joined);
    FileSink::new(output_dir)
        .dry_run(dry_run)
        .execute(&plan, &stats);
    info!(
        duration_secs = start_writing.elapsed().as_secs_f64(),
        planned = plan.len(),
        "Restore complete"
    );

    Ok(stats)
}
