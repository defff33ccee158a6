//! Normalization pipeline: raw provider table → validated `PriceSeries`.
//!
//! Steps, in order:
//! 1. empty table → `NoData`
//! 2. flatten multi-level headers and resolve the price fields
//! 3. required fields present, else `MissingColumns` (with what was received)
//! 4. coerce OHLC (then Volume) column by column; non-numeric cells reject the
//!    request or drop the row depending on the [`CleaningPolicy`]
//! 5. parse the index to calendar dates
//! 6. drop incomplete rows, sort by date, dedupe (polars)
//! 7. nothing left → `EmptyAfterCleaning`

pub mod coerce;
pub mod frame;
pub mod headers;

use crate::data::table::RawTable;
use crate::domain::PriceSeries;
use crate::error::ErrorKind;
use coerce::{coerce_cell, parse_index, Coerced};
use frame::{date_to_days, to_bars, Canonicalizer, CoercedColumns};
use headers::{flatten_headers, received_names, resolve_fields, Field, FlatColumn};
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What to do with a row holding a non-numeric price or an unusable date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningPolicy {
    /// Fail the whole request on the first offending cell.
    #[default]
    Reject,
    /// Drop the offending row and carry on.
    DropRows,
}

impl CleaningPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleaningPolicy::Reject => "reject",
            CleaningPolicy::DropRows => "drop_rows",
        }
    }
}

impl fmt::Display for CleaningPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleaningPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reject" => Ok(CleaningPolicy::Reject),
            "drop_rows" | "drop" => Ok(CleaningPolicy::DropRows),
            _ => Err(format!("unknown cleaning policy '{s}' (valid: reject, drop_rows)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("No data returned for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("Missing required column(s): {}", missing.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        received: Vec<String>,
    },

    #[error("Column '{column}' contains non-numeric data (row {row}: '{value}')")]
    NonNumeric {
        column: String,
        row: String,
        value: String,
    },

    #[error("Invalid date index value '{value}'")]
    InvalidIndex { value: String },

    #[error("No valid rows left for symbol '{symbol}' after cleaning")]
    EmptyAfterCleaning { symbol: String },

    #[error("frame error: {0}")]
    Frame(#[from] PolarsError),
}

impl NormalizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NormalizeError::Frame(_) => ErrorKind::Unclassified,
            _ => ErrorKind::UpstreamData,
        }
    }

    /// Flattened column names received, for missing-column errors.
    pub fn columns_received(&self) -> Option<&[String]> {
        match self {
            NormalizeError::MissingColumns { received, .. } => Some(received),
            _ => None,
        }
    }
}

/// Row accounting for one normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_received: usize,
    /// Rows dropped by `drop_rows` for non-numeric prices or bad dates.
    pub invalid_rows: usize,
    pub rows_kept: usize,
    /// Kept bars whose high/low do not bracket open/close.
    pub inconsistent_bars: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub series: PriceSeries,
    pub report: CleaningReport,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    pub policy: CleaningPolicy,
    pub require_volume: bool,
}

impl Normalizer {
    pub fn new(policy: CleaningPolicy, require_volume: bool) -> Self {
        Self {
            policy,
            require_volume,
        }
    }

    pub fn normalize(&self, symbol: &str, table: &RawTable) -> Result<Normalized, NormalizeError> {
        if table.is_empty() {
            return Err(NormalizeError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let flat = flatten_headers(table);
        let fields = resolve_fields(&flat, symbol);
        self.check_required(&fields, &flat)?;

        let rows = table.row_count();
        let mut invalid = vec![false; rows];
        let mut columns = CoercedColumns::default();

        for field in Field::OHLC {
            let values = self.coerce_column(table, fields[&field], true, &mut invalid)?;
            match field {
                Field::Open => columns.open = values,
                Field::High => columns.high = values,
                Field::Low => columns.low = values,
                _ => columns.close = values,
            }
        }
        columns.volume = match fields.get(&Field::Volume) {
            Some(column) => self.coerce_column(table, column, self.require_volume, &mut invalid)?,
            None => vec![None; rows],
        };

        columns.date = Vec::with_capacity(rows);
        for (row, key) in table.index.iter().enumerate() {
            match parse_index(key) {
                Some(date) => columns.date.push(Some(date_to_days(date))),
                None if self.policy == CleaningPolicy::Reject => {
                    return Err(NormalizeError::InvalidIndex {
                        value: key.to_string(),
                    });
                }
                None => {
                    invalid[row] = true;
                    columns.date.push(None);
                }
            }
        }

        // Dropped rows lose their date so the frame filter removes them.
        for (row, bad) in invalid.iter().enumerate() {
            if *bad {
                columns.date[row] = None;
            }
        }

        let cleaned = Canonicalizer::clean(columns.into_frame()?, self.require_volume)?;
        let bars = to_bars(&cleaned)?;

        let report = CleaningReport {
            rows_received: rows,
            invalid_rows: invalid.iter().filter(|b| **b).count(),
            rows_kept: bars.len(),
            inconsistent_bars: bars.iter().filter(|b| !b.is_sane()).count(),
        };

        tracing::debug!(
            symbol,
            received = report.rows_received,
            kept = report.rows_kept,
            invalid = report.invalid_rows,
            "Normalized price table"
        );

        if bars.is_empty() {
            return Err(NormalizeError::EmptyAfterCleaning {
                symbol: symbol.to_string(),
            });
        }
        if report.inconsistent_bars > 0 {
            tracing::warn!(
                symbol,
                count = report.inconsistent_bars,
                "Bars with high/low not bracketing open/close"
            );
        }

        Ok(Normalized {
            series: PriceSeries {
                symbol: symbol.to_string(),
                bars,
            },
            report,
        })
    }

    fn check_required(
        &self,
        fields: &HashMap<Field, &FlatColumn>,
        flat: &[FlatColumn],
    ) -> Result<(), NormalizeError> {
        let mut required = Field::OHLC.to_vec();
        if self.require_volume {
            required.push(Field::Volume);
        }
        let missing: Vec<String> = required
            .into_iter()
            .filter(|f| !fields.contains_key(f))
            .map(|f| f.name().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(NormalizeError::MissingColumns {
                missing,
                received: received_names(flat),
            })
        }
    }

    /// Coerce one column. Non-numeric cells in a `strict` column either fail
    /// (reject) or mark the row invalid (drop_rows); in a lenient column they
    /// become `None`.
    fn coerce_column(
        &self,
        table: &RawTable,
        column: &FlatColumn,
        strict: bool,
        invalid: &mut [bool],
    ) -> Result<Vec<Option<f64>>, NormalizeError> {
        let mut values = Vec::with_capacity(invalid.len());
        for (row, bad) in invalid.iter_mut().enumerate() {
            let cell = table.cell(column.source, row);
            match coerce_cell(cell) {
                Coerced::Value(v) => values.push(Some(v)),
                Coerced::Missing => values.push(None),
                Coerced::Invalid if !strict => values.push(None),
                Coerced::Invalid => match self.policy {
                    CleaningPolicy::Reject => {
                        return Err(NormalizeError::NonNumeric {
                            column: column.name.clone(),
                            row: table
                                .index
                                .get(row)
                                .map(|k| k.to_string())
                                .unwrap_or_else(|| row.to_string()),
                            value: cell.to_string(),
                        });
                    }
                    CleaningPolicy::DropRows => {
                        *bad = true;
                        values.push(None);
                    }
                },
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::{Cell, ColumnHeader, IndexKey};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    /// Single-level table with Date-text index and OHLCV columns.
    fn table(rows: &[(&str, [Cell; 5])]) -> RawTable {
        let index = rows.iter().map(|(d, _)| IndexKey::Text(d.to_string())).collect();
        let mut t = RawTable::new(index);
        for (i, name) in ["Open", "High", "Low", "Close", "Volume"].iter().enumerate() {
            let cells = rows.iter().map(|(_, c)| c[i].clone()).collect();
            t.push_column(ColumnHeader::single(*name), cells);
        }
        t
    }

    fn good(o: f64, c: f64) -> [Cell; 5] {
        [
            Cell::Number(o),
            Cell::Number(o.max(c) + 1.0),
            Cell::Number(o.min(c) - 1.0),
            Cell::Number(c),
            Cell::Number(1_000.0),
        ]
    }

    #[test]
    fn clean_table_passes_through() {
        let t = table(&[
            ("2024-01-02", good(10.0, 11.0)),
            ("2024-01-03", good(11.0, 10.5)),
        ]);
        let out = Normalizer::default().normalize("SPY", &t).unwrap();
        assert_eq!(out.series.len(), 2);
        assert_eq!(out.series.bars[0].date, date(2));
        assert_eq!(out.series.bars[1].close, 10.5);
        assert_eq!(out.series.bars[0].volume, Some(1_000.0));
        assert_eq!(out.report.rows_kept, 2);
        assert_eq!(out.report.inconsistent_bars, 0);
    }

    #[test]
    fn empty_table_is_no_data() {
        let err = Normalizer::default().normalize("SPY", &RawTable::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::NoData { .. }));
        assert_eq!(err.to_string(), "No data returned for symbol 'SPY'");
    }

    #[test]
    fn missing_close_names_field_and_received_columns() {
        let t = RawTable::new(vec![IndexKey::Text("2024-01-02".into())])
            .with_column(ColumnHeader::single("Open"), vec![Cell::Number(1.0)])
            .with_column(ColumnHeader::single("High"), vec![Cell::Number(1.0)])
            .with_column(ColumnHeader::single("Low"), vec![Cell::Number(1.0)]);

        let err = Normalizer::default().normalize("SPY", &t).unwrap_err();
        assert_eq!(err.to_string(), "Missing required column(s): Close");
        assert_eq!(
            err.columns_received().unwrap(),
            ["Open".to_string(), "High".into(), "Low".into()]
        );
    }

    #[test]
    fn required_volume_is_checked() {
        let t = RawTable::new(vec![IndexKey::Text("2024-01-02".into())])
            .with_column(ColumnHeader::single("Open"), vec![Cell::Number(1.0)])
            .with_column(ColumnHeader::single("High"), vec![Cell::Number(1.0)])
            .with_column(ColumnHeader::single("Low"), vec![Cell::Number(1.0)])
            .with_column(ColumnHeader::single("Close"), vec![Cell::Number(1.0)]);

        assert!(Normalizer::default().normalize("SPY", &t).is_ok());
        let err = Normalizer::new(CleaningPolicy::Reject, true)
            .normalize("SPY", &t)
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required column(s): Volume");
    }

    #[test]
    fn reject_policy_names_non_numeric_column() {
        let mut bad = good(10.0, 11.0);
        bad[3] = Cell::Text("n/a".into());
        let t = table(&[("2024-01-02", good(10.0, 11.0)), ("2024-01-03", bad)]);

        let err = Normalizer::default().normalize("SPY", &t).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column 'Close' contains non-numeric data (row 2024-01-03: 'n/a')"
        );
        assert_eq!(err.kind(), ErrorKind::UpstreamData);
    }

    #[test]
    fn drop_rows_policy_discards_offending_rows() {
        let mut bad = good(10.0, 11.0);
        bad[1] = Cell::Text("oops".into());
        let t = table(&[
            ("2024-01-02", good(10.0, 11.0)),
            ("2024-01-03", bad),
            ("not a date", good(1.0, 2.0)),
        ]);

        let out = Normalizer::new(CleaningPolicy::DropRows, false)
            .normalize("SPY", &t)
            .unwrap();
        assert_eq!(out.series.len(), 1);
        assert_eq!(out.report.invalid_rows, 2);
    }

    #[test]
    fn drop_rows_that_drops_everything_is_empty_after_cleaning() {
        let mut bad = good(10.0, 11.0);
        bad[0] = Cell::Text("x".into());
        let t = table(&[("2024-01-02", bad)]);

        let err = Normalizer::new(CleaningPolicy::DropRows, false)
            .normalize("SPY", &t)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyAfterCleaning { .. }));
    }

    #[test]
    fn missing_prices_drop_rows_under_both_policies() {
        let mut gap = good(10.0, 11.0);
        gap[2] = Cell::Missing;
        let t = table(&[("2024-01-02", gap), ("2024-01-03", good(1.0, 2.0))]);

        for policy in [CleaningPolicy::Reject, CleaningPolicy::DropRows] {
            let out = Normalizer::new(policy, false).normalize("SPY", &t).unwrap();
            assert_eq!(out.series.len(), 1);
            assert_eq!(out.series.bars[0].date, date(3));
        }
    }

    #[test]
    fn bad_volume_becomes_absent_unless_required() {
        let mut odd = good(10.0, 11.0);
        odd[4] = Cell::Text("-".into());
        let t = table(&[("2024-01-02", odd)]);

        let out = Normalizer::default().normalize("SPY", &t).unwrap();
        assert_eq!(out.series.bars[0].volume, None);

        let err = Normalizer::new(CleaningPolicy::Reject, true)
            .normalize("SPY", &t)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::NonNumeric { ref column, .. } if column == "Volume"));
    }

    #[test]
    fn unparseable_index_is_rejected_by_default() {
        let t = table(&[("someday", good(10.0, 11.0))]);
        let err = Normalizer::default().normalize("SPY", &t).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date index value 'someday'");
    }

    #[test]
    fn multi_level_headers_are_flattened() {
        let index = vec![IndexKey::Epoch(1_704_153_600), IndexKey::Epoch(1_704_240_000)];
        let mut t = RawTable::new(index);
        for name in ["Close", "High", "Low", "Open", "Volume"] {
            t.push_column(
                ColumnHeader::multi([name, "AAPL"]),
                vec![Cell::Number(10.0), Cell::Number(11.0)],
            );
        }
        let out = Normalizer::default().normalize("AAPL", &t).unwrap();
        assert_eq!(out.series.len(), 2);
        assert_eq!(out.series.first_date(), Some(date(2)));
    }

    #[test]
    fn parses_cleaning_policy() {
        assert_eq!("reject".parse::<CleaningPolicy>().unwrap(), CleaningPolicy::Reject);
        assert_eq!("drop-rows".parse::<CleaningPolicy>().unwrap(), CleaningPolicy::DropRows);
        assert!("lenient".parse::<CleaningPolicy>().is_err());
    }

    fn cell_strategy() -> impl Strategy<Value = Cell> {
        prop_oneof![
            6 => (1.0f64..1_000.0).prop_map(Cell::Number),
            1 => Just(Cell::Missing),
            1 => Just(Cell::Text("bad".into())),
            1 => (1.0f64..1_000.0).prop_map(|v| Cell::Text(format!("{v}"))),
        ]
    }

    proptest! {
        #[test]
        fn output_is_sorted_unique_and_finite(
            rows in prop::collection::vec(
                (1u32..28, prop::array::uniform5(cell_strategy())),
                1..40,
            )
        ) {
            let dated: Vec<(String, [Cell; 5])> = rows
                .into_iter()
                .map(|(d, cells)| (format!("2024-02-{d:02}"), cells))
                .collect();
            let borrowed: Vec<(&str, [Cell; 5])> =
                dated.iter().map(|(d, c)| (d.as_str(), c.clone())).collect();
            let t = table(&borrowed);

            if let Ok(out) = Normalizer::new(CleaningPolicy::DropRows, false).normalize("X", &t) {
                let bars = &out.series.bars;
                prop_assert!(!bars.is_empty());
                prop_assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
                let all_finite = bars.iter().all(|b| {
                    b.open.is_finite() && b.high.is_finite() && b.low.is_finite() && b.close.is_finite()
                });
                prop_assert!(all_finite);
                prop_assert!(out.report.rows_kept <= out.report.rows_received);
            }
        }

        #[test]
        fn reject_never_lets_text_through(
            rows in prop::collection::vec(prop::array::uniform5(cell_strategy()), 1..20)
        ) {
            let dated: Vec<(String, [Cell; 5])> = rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| (format!("2024-03-{:02}", i + 1), cells))
                .collect();
            let has_bad_price = dated
                .iter()
                .any(|(_, c)| c[..4].iter().any(|cell| matches!(cell, Cell::Text(s) if s == "bad")));
            let borrowed: Vec<(&str, [Cell; 5])> =
                dated.iter().map(|(d, c)| (d.as_str(), c.clone())).collect();

            let result = Normalizer::default().normalize("X", &table(&borrowed));
            if has_bad_price {
                let is_non_numeric = matches!(result, Err(NormalizeError::NonNumeric { .. }));
                prop_assert!(is_non_numeric);
            }
        }
    }
}
