//! Raw, untrusted tabular output of a data provider.
//!
//! A `RawTable` is what a provider hands to the normalizer: an index column of
//! row keys plus columns whose headers may have several levels and whose cells
//! may be numbers, free text or missing. Nothing here is validated; that is
//! the normalizer's job.

use serde_json::Value;
use std::fmt;

/// One cell of a raw column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Convert a loose JSON value (as found in provider payloads) into a cell.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Missing,
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Missing),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Cell from a CSV field; empty fields are missing.
    pub fn from_field(field: &str) -> Self {
        if field.trim().is_empty() {
            Cell::Missing
        } else {
            Cell::Text(field.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::Number).unwrap_or(Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Missing => write!(f, "<missing>"),
        }
    }
}

/// Row key of a raw table.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    /// Unix epoch seconds (UTC).
    Epoch(i64),
    /// Date or date-time text as written by the source.
    Text(String),
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Epoch(ts) => write!(f, "{ts}"),
            IndexKey::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Column header with one name per header level, outermost first.
///
/// Single-level tables have exactly one level. Multi-ticker exports produce
/// two levels such as `["Close", "AAPL"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    levels: Vec<String>,
}

impl ColumnHeader {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            levels: vec![name.into()],
        }
    }

    pub fn multi<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn is_multi_level(&self) -> bool {
        self.levels.len() > 1
    }
}

impl fmt::Display for ColumnHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.levels.len() == 1 {
            write!(f, "{}", self.levels[0])
        } else {
            write!(f, "({})", self.levels.join(", "))
        }
    }
}

/// A named column of raw cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub header: ColumnHeader,
    pub cells: Vec<Cell>,
}

/// Untrusted table returned by a provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub index: Vec<IndexKey>,
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn new(index: Vec<IndexKey>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Builder-style column append. Short columns read as missing past their end.
    pub fn with_column(mut self, header: ColumnHeader, cells: Vec<Cell>) -> Self {
        self.columns.push(RawColumn { header, cells });
        self
    }

    pub fn push_column(&mut self, header: ColumnHeader, cells: Vec<Cell>) {
        self.columns.push(RawColumn { header, cells });
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    /// A table is empty when it has no rows or no data columns.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    pub fn has_multi_level_headers(&self) -> bool {
        self.columns.iter().any(|c| c.header.is_multi_level())
    }

    /// Cell at `row` of column `col`, missing when out of range.
    pub fn cell(&self, col: usize, row: usize) -> &Cell {
        static MISSING: Cell = Cell::Missing;
        self.columns
            .get(col)
            .and_then(|c| c.cells.get(row))
            .unwrap_or(&MISSING)
    }
}
