use serde::Deserialize;
use uuid::Uuid;

use crate::dates;
use crate::error::{Result, SyncError};
use crate::filter;
use crate::models::{Cell, RawRow, ReservationRecord};

// ---------------------------------------------------------------------------
// Column layouts
// ---------------------------------------------------------------------------

/// Zero-based column positions. `None` means the column does not exist in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnLayout {
    pub date: usize,
    pub customer_name: usize,
    pub category: usize,
    pub unit_price: usize,
    pub number_of_people: usize,
    pub tennis_court: usize,
    pub banquet_hall: usize,
    #[serde(default)]
    pub other: Option<usize>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub rooms: Option<usize>,
}

impl ColumnLayout {
    /// Ten columns: A date, B unused, C customer .. I other, J total.
    pub fn full() -> Self {
        Self {
            total: Some(9),
            ..Self::short()
        }
    }

    /// Nine columns, no total; the total is always computed.
    pub fn short() -> Self {
        Self {
            date: 0,
            customer_name: 2,
            category: 3,
            unit_price: 4,
            number_of_people: 5,
            tennis_court: 6,
            banquet_hall: 7,
            other: Some(8),
            total: None,
            rooms: None,
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::full()),
            "short" => Ok(Self::short()),
            _ => Err(SyncError::UnknownLayout(name.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization policy
// ---------------------------------------------------------------------------

/// How an empty or unrecognised category cell is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryPolicy {
    /// Empty category rejects the row.
    Strict,
    /// Empty category becomes `default`; with `allowed` set, anything outside it does too.
    Lenient {
        default: String,
        allowed: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizePolicy {
    pub category: CategoryPolicy,
    /// Value used when the people count is missing or unreadable.
    pub people_default: u64,
    /// Header-artifact categories on top of the built-in ones. They are never
    /// remapped, so the row filter still sees them.
    pub header_sentinels: Vec<String>,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            category: CategoryPolicy::Strict,
            people_default: 0,
            header_sentinels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnparseableDate,
    EmptyCategory,
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Read a non-negative whole number: ints, floats (truncated), and numeric text
/// such as `"1,200"` or `" 3.0 "`. Anything else is `None`.
pub fn coerce_u64(cell: &Cell) -> Option<u64> {
    let value = match cell {
        Cell::Int(i) => *i as f64,
        Cell::Float(f) => *f,
        Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    if !value.is_finite() || value < 0.0 || value >= u64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as u64)
}

pub fn coerce_u64_or(cell: &Cell, default: u64) -> u64 {
    coerce_u64(cell).unwrap_or(default)
}

/// Render a cell as trimmed text. Whole floats print without a fraction.
pub fn coerce_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Int(i) => i.to_string(),
        Cell::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{}", *f as i64),
        Cell::Float(f) => f.to_string(),
        Cell::Bool(b) => b.to_string(),
        Cell::DateTime(dt) => dt.date().to_string(),
        Cell::Empty | Cell::Error => String::new(),
    }
}

fn coerce_category(cell: &Cell, policy: &NormalizePolicy) -> std::result::Result<String, Rejection> {
    let raw = coerce_text(cell);
    if filter::is_header_artifact(&raw, &policy.header_sentinels) {
        return Ok(raw);
    }
    match &policy.category {
        CategoryPolicy::Strict if raw.is_empty() => Err(Rejection::EmptyCategory),
        CategoryPolicy::Strict => Ok(raw),
        CategoryPolicy::Lenient { default, .. } if raw.is_empty() => Ok(default.clone()),
        CategoryPolicy::Lenient {
            default,
            allowed: Some(allowed),
        } if !allowed.iter().any(|a| *a == raw) => Ok(default.clone()),
        CategoryPolicy::Lenient { .. } => Ok(raw),
    }
}

/// Room cells hold identifiers separated by commas, 、 or whitespace.
fn split_rooms(cell: &Cell) -> Vec<String> {
    coerce_text(cell)
        .split(|c: char| c == ',' || c == '、' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

static EMPTY: Cell = Cell::Empty;

fn cell_at(row: &RawRow, idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY)
}

/// Map one raw row to a record. The date is resolved first; an unreadable date
/// rejects the row before any other cell is looked at.
pub fn normalize(
    row: &RawRow,
    layout: &ColumnLayout,
    policy: &NormalizePolicy,
) -> std::result::Result<ReservationRecord, Rejection> {
    let date = dates::resolve(cell_at(row, layout.date)).ok_or(Rejection::UnparseableDate)?;
    let category = coerce_category(cell_at(row, layout.category), policy)?;
    let optional = |idx: Option<usize>| idx.map_or(0, |i| coerce_u64_or(cell_at(row, i), 0));

    let mut record = ReservationRecord {
        id: Uuid::new_v4(),
        date,
        customer_name: coerce_text(cell_at(row, layout.customer_name)),
        category,
        unit_price: coerce_u64_or(cell_at(row, layout.unit_price), 0),
        number_of_people: coerce_u64_or(cell_at(row, layout.number_of_people), policy.people_default),
        tennis_court: coerce_u64_or(cell_at(row, layout.tennis_court), 0),
        banquet_hall: coerce_u64_or(cell_at(row, layout.banquet_hall), 0),
        other: optional(layout.other),
        total_amount: 0,
        rooms: layout.rooms.map(|i| split_rooms(cell_at(row, i))).unwrap_or_default(),
    };
    record.total_amount = layout
        .total
        .and_then(|i| coerce_u64(cell_at(row, i)))
        .unwrap_or_else(|| record.computed_total());
    Ok(record)
}
