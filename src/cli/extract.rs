use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::extractor::{breakdown, Extraction};
use crate::fmt::{grouped, yen};
use crate::plan::Source;

use super::{extract_sources, RunArgs};

pub fn run(args: &RunArgs) -> Result<()> {
    let plan = args.resolve()?;
    let results = extract_sources(&plan)?;
    print_sources(&results);
    Ok(())
}

/// Per-source accept/skip counts followed by the combined category and year breakdown.
pub(crate) fn print_sources(results: &[(Source, Extraction)]) {
    let mut table = Table::new();
    table.set_header(vec![
        "Source", "Sheet", "Range", "Accepted", "Bad date", "Rejected", "Out of range",
    ]);
    let mut combined = Extraction::default();
    for (source, extraction) in results {
        let s = &extraction.skipped;
        let rejected = s.empty_category + s.empty_customer + s.placeholder_name + s.header_artifact;
        table.add_row(vec![
            Cell::new(source.file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()),
            Cell::new(&source.sheet),
            Cell::new(source.config.range),
            Cell::new(grouped(extraction.accepted() as u64)),
            Cell::new(s.bad_date),
            Cell::new(rejected),
            Cell::new(s.out_of_range),
        ]);
        combined.merge(extraction.clone());
    }
    println!("Sources\n{table}");

    let b = breakdown(&combined.records);
    let mut by_category = Table::new();
    by_category.set_header(vec!["Category", "Records"]);
    for (category, count) in &b.by_category {
        by_category.add_row(vec![Cell::new(category), Cell::new(count)]);
    }
    println!("By category\n{by_category}");

    let mut by_year = Table::new();
    by_year.set_header(vec!["Year", "Records"]);
    for (year, count) in &b.by_year {
        by_year.add_row(vec![Cell::new(year), Cell::new(count)]);
    }
    println!("By year\n{by_year}");

    match (b.first_date, b.last_date) {
        (Some(first), Some(last)) => println!(
            "{} records, {first} to {last}, total {}",
            grouped(combined.accepted() as u64).bold(),
            yen(b.total_amount)
        ),
        _ => println!("{}", "No admissible records found.".yellow()),
    }
}
