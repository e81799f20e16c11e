use std::collections::BTreeMap;
#[cfg(feature = "xlsx")]
use std::path::Path;

use chrono::Datelike;
use tracing::{info, trace};

use crate::dates::DateRange;
#[cfg(feature = "xlsx")]
use crate::error::{Result, SyncError};
use crate::filter::{self, FilterReason};
use crate::models::{RawRow, ReservationRecord};
use crate::normalizer::{self, ColumnLayout, NormalizePolicy, Rejection};

/// Upstream exports sometimes write a missing name as the literal text `None`.
const PLACEHOLDER_NAME: &str = "None";

/// Everything needed to turn one sheet's rows into admissible records.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub layout: ColumnLayout,
    pub policy: NormalizePolicy,
    pub range: DateRange,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkipCounts {
    pub bad_date: usize,
    pub empty_category: usize,
    pub empty_customer: usize,
    pub placeholder_name: usize,
    pub header_artifact: usize,
    pub out_of_range: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.bad_date
            + self.empty_category
            + self.empty_customer
            + self.placeholder_name
            + self.header_artifact
            + self.out_of_range
    }

    fn add(&mut self, other: &SkipCounts) {
        self.bad_date += other.bad_date;
        self.empty_category += other.empty_category;
        self.empty_customer += other.empty_customer;
        self.placeholder_name += other.placeholder_name;
        self.header_artifact += other.header_artifact;
        self.out_of_range += other.out_of_range;
    }
}

#[derive(Debug, Default, Clone)]
pub struct Extraction {
    /// Admissible records in source row order.
    pub records: Vec<ReservationRecord>,
    pub skipped: SkipCounts,
}

impl Extraction {
    pub fn accepted(&self) -> usize {
        self.records.len()
    }

    /// Append another extraction, keeping its records after ours.
    pub fn merge(&mut self, other: Extraction) {
        self.records.extend(other.records);
        self.skipped.add(&other.skipped);
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Drive rows through date resolution, normalization, and admission. A bad row is
/// counted and dropped; it never stops the rest of the sheet.
pub fn extract<I>(rows: I, config: &ExtractConfig) -> Extraction
where
    I: IntoIterator<Item = RawRow>,
{
    let mut out = Extraction::default();
    for (idx, row) in rows.into_iter().enumerate() {
        let record = match normalizer::normalize(&row, &config.layout, &config.policy) {
            Ok(r) => r,
            Err(reason) => {
                trace!(row = idx + 1, ?reason, "row rejected");
                match reason {
                    Rejection::UnparseableDate => out.skipped.bad_date += 1,
                    Rejection::EmptyCategory => out.skipped.empty_category += 1,
                }
                continue;
            }
        };
        if record.customer_name == PLACEHOLDER_NAME {
            trace!(row = idx + 1, "placeholder customer name");
            out.skipped.placeholder_name += 1;
            continue;
        }
        if let Some(reason) = filter::rejection(&record, &config.range, &config.policy.header_sentinels) {
            trace!(row = idx + 1, ?reason, date = %record.date, "row filtered");
            match reason {
                FilterReason::EmptyCustomer => out.skipped.empty_customer += 1,
                FilterReason::HeaderArtifact => out.skipped.header_artifact += 1,
                FilterReason::OutOfRange => out.skipped.out_of_range += 1,
            }
            continue;
        }
        out.records.push(record);
    }
    info!(
        range = %config.range,
        accepted = out.accepted(),
        skipped = out.skipped.total(),
        "extraction finished"
    );
    out
}

// ---------------------------------------------------------------------------
// Breakdown for operator review
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Breakdown {
    pub by_category: BTreeMap<String, usize>,
    pub by_year: BTreeMap<i32, usize>,
    pub total_amount: u64,
    pub first_date: Option<chrono::NaiveDate>,
    pub last_date: Option<chrono::NaiveDate>,
}

pub fn breakdown(records: &[ReservationRecord]) -> Breakdown {
    let mut b = Breakdown::default();
    for r in records {
        *b.by_category.entry(r.category.clone()).or_default() += 1;
        *b.by_year.entry(r.date.year()).or_default() += 1;
        b.total_amount = b.total_amount.saturating_add(r.total_amount);
    }
    b.first_date = records.iter().map(|r| r.date).min();
    b.last_date = records.iter().map(|r| r.date).max();
    b
}

// ---------------------------------------------------------------------------
// Workbook reading (feature-gated)
// ---------------------------------------------------------------------------

/// Read every row of `sheet`, keeping absolute column positions even when the
/// sheet's used range does not start at column A.
#[cfg(feature = "xlsx")]
pub fn read_sheet(file_path: &Path, sheet: &str) -> Result<Vec<RawRow>> {
    use calamine::Reader;
    use crate::models::Cell;

    if !file_path.is_file() {
        return Err(SyncError::SourceNotFound(file_path.to_path_buf()));
    }
    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| SyncError::Workbook(format!("Failed to open {}: {e}", file_path.display())))?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(SyncError::UnknownSheet(sheet.to_string()));
    }
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| SyncError::Workbook(format!("Failed to read sheet {sheet}: {e}")))?;
    let lead = range.start().map_or(0, |(_, col)| col as usize);

    let rows = range
        .rows()
        .map(|row| {
            let mut cells = vec![Cell::Empty; lead];
            cells.extend(row.iter().map(cell_from_data));
            cells
        })
        .collect();
    Ok(rows)
}

#[cfg(feature = "xlsx")]
fn cell_from_data(data: &calamine::Data) -> crate::models::Cell {
    use crate::dates;
    use crate::models::Cell;
    use calamine::Data;

    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        // as_datetime applies the workbook's 1900/1904 date system; the raw serial does not.
        Data::DateTime(dt) => dt
            .as_datetime()
            .or_else(|| dates::serial_to_datetime(dt.as_f64()))
            .map_or(Cell::Error, Cell::DateTime),
        Data::DateTimeIso(s) => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .or_else(|| dates::parse_iso_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
            .map_or_else(|| Cell::Text(s.clone()), Cell::DateTime),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Error,
    }
}
