//! Cell → number and index → date coercion.

use crate::data::table::{Cell, IndexKey};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Outcome of coercing one cell to a price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    Value(f64),
    /// Blank, null or NaN: the row is incomplete.
    Missing,
    /// Present but not a finite number.
    Invalid,
}

pub fn coerce_cell(cell: &Cell) -> Coerced {
    match cell {
        Cell::Missing => Coerced::Missing,
        Cell::Number(v) => classify(*v),
        Cell::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Coerced::Missing;
            }
            match text.parse::<f64>() {
                Ok(v) => classify(v),
                Err(_) => Coerced::Invalid,
            }
        }
    }
}

fn classify(v: f64) -> Coerced {
    if v.is_nan() {
        Coerced::Missing
    } else if v.is_finite() {
        Coerced::Value(v)
    } else {
        Coerced::Invalid
    }
}

const DATETIME_TZ_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Normalize a row key to a calendar date.
///
/// Epoch seconds use the UTC date. Text with an offset keeps the date as
/// written (the exchange-local date), not the UTC one.
pub fn parse_index(key: &IndexKey) -> Option<NaiveDate> {
    match key {
        IndexKey::Epoch(ts) => DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()),
        IndexKey::Text(text) => parse_date_text(text.trim()),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_TZ_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}
