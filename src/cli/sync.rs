use colored::Colorize;
use comfy_table::{Cell, Table};
use tracing::info;

use crate::error::{Result, SyncError};
use crate::extractor::Extraction;
use crate::reconciler::{reconcile_ranges, ReconcileReport};
use crate::settings::load_settings;
use crate::store::RestStore;

use super::extract::print_sources;
use super::{extract_sources, RunArgs};

pub fn run(args: &RunArgs, dry_run: bool) -> Result<()> {
    let plan = args.resolve()?;
    let results = extract_sources(&plan)?;
    print_sources(&results);

    if dry_run {
        println!("{}", "Dry run: nothing was sent to the store.".yellow());
        return Ok(());
    }

    let store = RestStore::new(&load_settings()?)?;
    let mut combined = Extraction::default();
    for (_, extraction) in results {
        combined.merge(extraction);
    }
    let ranges = plan.ranges();
    info!(records = combined.accepted(), ranges = ranges.len(), "starting reconciliation");

    let report = reconcile_ranges(&store, &ranges, &combined.records, &plan.upload);
    print_report(&report);

    if report.failed > 0 {
        return Err(SyncError::Other(format!("{} records were not inserted", report.failed)));
    }
    Ok(())
}

fn print_report(report: &ReconcileReport) {
    let mut table = Table::new();
    table.set_header(vec!["Deleted", "Inserted", "Failed"]);
    let deleted = if report.deleted {
        "yes".green().to_string()
    } else {
        "FAILED".red().to_string()
    };
    let failed = if report.failed == 0 {
        report.failed.to_string().green().to_string()
    } else {
        report.failed.to_string().red().to_string()
    };
    table.add_row(vec![Cell::new(deleted), Cell::new(report.inserted), Cell::new(failed)]);
    println!("Sync\n{table}");

    if !report.sample_errors.is_empty() {
        println!("Errors (first {}):", report.sample_errors.len());
        for e in &report.sample_errors {
            println!("  {e}");
        }
    }
}
