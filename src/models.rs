use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

/// One untyped spreadsheet cell, independent of the workbook library.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
    Error,
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// A raw sheet row in source order. Short rows are padded with `Cell::Empty` on access.
pub type RawRow = Vec<Cell>;

/// A validated reservation, serialized with the remote table's column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub customer_name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub unit_price: u64,
    pub number_of_people: u64,
    pub tennis_court: u64,
    pub banquet_hall: u64,
    pub other: u64,
    pub total_amount: u64,
    pub rooms: Vec<String>,
}

impl ReservationRecord {
    /// `unit_price * number_of_people + tennis_court + banquet_hall + other`, saturating.
    pub fn computed_total(&self) -> u64 {
        self.unit_price
            .saturating_mul(self.number_of_people)
            .saturating_add(self.tennis_court)
            .saturating_add(self.banquet_hall)
            .saturating_add(self.other)
    }
}
