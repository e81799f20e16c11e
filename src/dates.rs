use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::{Result, SyncError};
use crate::models::Cell;

/// Spreadsheet serial day 0. Day 60 lands on 1900-02-28, skipping the phantom 1900-02-29.
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch")
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"))
}

/// Whole days since the serial epoch; the time-of-day fraction is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    serial_epoch().checked_add_days(Days::new(serial.trunc() as u64))
}

pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let date = serial_to_date(serial)?;
    let secs = (serial.fract() * 86_400.0).round() as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs.min(86_399), 0)?;
    Some(date.and_time(time))
}

/// Canonical `YYYY-MM-DD` only; `2026-1-5` or `2026/01/05` are not accepted.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if !iso_date_re().is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Resolve a date cell to a calendar date, or `None` when it cannot be read as one.
pub fn resolve(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Int(i) => serial_to_date(*i as f64),
        Cell::Float(f) => serial_to_date(*f),
        Cell::Text(s) => parse_iso_date(s),
        Cell::Empty | Cell::Bool(_) | Cell::Error => None,
    }
}

// ---------------------------------------------------------------------------
// Date ranges
// ---------------------------------------------------------------------------

/// Inclusive calendar range used for both row admission and remote deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SyncError::InvalidRange(format!("{start} is after {end}")));
        }
        Ok(Self { start, end })
    }

    #[allow(dead_code)]
    pub fn year(year: i32) -> Result<Self> {
        Self::parse(&year.to_string(), &year.to_string())
    }

    /// Months `first..=last` of one year, e.g. `months(2026, 1, 9)`.
    #[allow(dead_code)]
    pub fn months(year: i32, first: u32, last: u32) -> Result<Self> {
        Self::parse(&format!("{year}-{first:02}"), &format!("{year}-{last:02}"))
    }

    /// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD` bounds. The end bound expands to the
    /// last day of its period.
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        let start = parse_bound(from, false)?;
        let end = parse_bound(to, true)?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

fn parse_bound(raw: &str, is_end: bool) -> Result<NaiveDate> {
    let invalid = || SyncError::InvalidRange(format!("bad bound '{raw}' (want YYYY, YYYY-MM or YYYY-MM-DD)"));
    let parts: Vec<&str> = raw.trim().split('-').collect();
    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.parse::<u32>().map_err(|_| invalid()))
        .collect::<Result<_>>()?;
    let year = *nums.first().ok_or_else(invalid)? as i32;
    match nums.len() {
        1 if is_end => NaiveDate::from_ymd_opt(year, 12, 31),
        1 => NaiveDate::from_ymd_opt(year, 1, 1),
        2 if is_end => last_day_of_month(year, nums[1]),
        2 => NaiveDate::from_ymd_opt(year, nums[1], 1),
        3 => NaiveDate::from_ymd_opt(year, nums[1], nums[2]),
        _ => None,
    }
    .ok_or_else(invalid)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_serial_known_pairs() {
        assert_eq!(resolve(&Cell::Int(0)), Some(ymd(1899, 12, 30)));
        assert_eq!(resolve(&Cell::Int(1)), Some(ymd(1899, 12, 31)));
        assert_eq!(resolve(&Cell::Int(61)), Some(ymd(1900, 3, 1)));
        assert_eq!(resolve(&Cell::Float(45000.0)), Some(ymd(2023, 3, 15)));
        assert_eq!(resolve(&Cell::Float(45667.0)), Some(ymd(2025, 1, 10)));
    }

    #[test]
    fn test_serial_matches_epoch_plus_days() {
        for s in [0i64, 1, 59, 60, 365, 10_000, 46_022, 2_958_465] {
            let expected = ymd(1899, 12, 30) + chrono::Duration::days(s);
            assert_eq!(resolve(&Cell::Int(s)), Some(expected), "serial {s}");
        }
    }

    #[test]
    fn test_serial_fraction_is_discarded() {
        assert_eq!(resolve(&Cell::Float(46023.99)), Some(ymd(2026, 1, 1)));
        assert_eq!(resolve(&Cell::Float(46023.25)), Some(ymd(2026, 1, 1)));
    }

    #[test]
    fn test_unusable_serials() {
        assert_eq!(resolve(&Cell::Float(-1.0)), None);
        assert_eq!(resolve(&Cell::Float(f64::NAN)), None);
        assert_eq!(resolve(&Cell::Float(f64::INFINITY)), None);
        assert_eq!(resolve(&Cell::Float(1e300)), None);
    }

    #[test]
    fn test_native_datetime_truncates() {
        let dt = ymd(2026, 4, 2).and_hms_opt(18, 30, 0).unwrap();
        assert_eq!(resolve(&Cell::DateTime(dt)), Some(ymd(2026, 4, 2)));
    }

    #[test]
    fn test_text_must_be_canonical() {
        assert_eq!(resolve(&Cell::Text("2026-02-01".into())), Some(ymd(2026, 2, 1)));
        assert_eq!(resolve(&Cell::Text(" 2026-02-01 ".into())), Some(ymd(2026, 2, 1)));
        assert_eq!(resolve(&Cell::Text("2026-2-1".into())), None);
        assert_eq!(resolve(&Cell::Text("2026/02/01".into())), None);
        assert_eq!(resolve(&Cell::Text("2026-02-30".into())), None);
        assert_eq!(resolve(&Cell::Text("日付".into())), None);
    }

    #[test]
    fn test_other_cells_unparseable() {
        assert_eq!(resolve(&Cell::Empty), None);
        assert_eq!(resolve(&Cell::Bool(true)), None);
        assert_eq!(resolve(&Cell::Error), None);
    }

    #[test]
    fn test_serial_to_datetime_keeps_time() {
        let dt = serial_to_datetime(46023.5).unwrap();
        assert_eq!(dt, ymd(2026, 1, 1).and_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_range_parse_expands_bounds() {
        let r = DateRange::parse("2023", "2025").unwrap();
        assert_eq!(r.start, ymd(2023, 1, 1));
        assert_eq!(r.end, ymd(2025, 12, 31));

        let r = DateRange::months(2026, 1, 9).unwrap();
        assert_eq!(r.start, ymd(2026, 1, 1));
        assert_eq!(r.end, ymd(2026, 9, 30));

        let r = DateRange::parse("2024-02", "2024-02").unwrap();
        assert_eq!(r.end, ymd(2024, 2, 29));

        let r = DateRange::parse("2026-03-05", "2026-12").unwrap();
        assert_eq!(r.start, ymd(2026, 3, 5));
        assert_eq!(r.end, ymd(2026, 12, 31));
    }

    #[test]
    fn test_range_rejects_bad_input() {
        assert!(DateRange::parse("2026", "2025").is_err());
        assert!(DateRange::parse("2026-13", "2026-13").is_err());
        assert!(DateRange::parse("next year", "2026").is_err());
        assert!(DateRange::parse("2026-01-01-01", "2026").is_err());
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let r = DateRange::months(2026, 1, 9).unwrap();
        assert!(r.contains(ymd(2026, 1, 1)));
        assert!(r.contains(ymd(2026, 9, 30)));
        assert!(!r.contains(ymd(2026, 10, 1)));
        assert!(!r.contains(ymd(2025, 12, 31)));
    }
}
