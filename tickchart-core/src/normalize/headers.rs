//! Header flattening and price-field resolution.

use crate::data::table::{ColumnHeader, RawTable};
use std::collections::HashMap;
use std::fmt;

/// Price fields the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl Field {
    /// Fields every retained row must carry.
    pub const OHLC: [Field; 4] = [Field::Open, Field::High, Field::Low, Field::Close];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Open => "Open",
            Field::High => "High",
            Field::Low => "Low",
            Field::Close => "Close",
            Field::AdjClose => "Adj Close",
            Field::Volume => "Volume",
        }
    }

    /// Recognize a header label, ignoring case, spaces, `_` and `-`.
    pub fn from_label(label: &str) -> Option<Field> {
        let key: String = label
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "open" => Some(Field::Open),
            "high" => Some(Field::High),
            "low" => Some(Field::Low),
            "close" => Some(Field::Close),
            "adjclose" => Some(Field::AdjClose),
            "volume" => Some(Field::Volume),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A column after flattening to a single-level name.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatColumn {
    /// Position of the column in the raw table.
    pub source: usize,
    /// Single-level name as received.
    pub name: String,
    pub field: Option<Field>,
    /// Remaining non-empty header levels (usually the ticker).
    pub qualifiers: Vec<String>,
}

/// Flatten one header: the level naming a known field wins, otherwise the
/// non-empty levels are joined with `_`.
pub fn flatten_header(header: &ColumnHeader) -> (String, Option<Field>, Vec<String>) {
    let levels: Vec<&str> = header
        .levels()
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    match levels.iter().position(|l| Field::from_label(l).is_some()) {
        Some(pos) => {
            let name = levels[pos].to_string();
            let field = Field::from_label(&name);
            let qualifiers = levels
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != pos)
                .map(|(_, l)| l.to_string())
                .collect();
            (name, field, qualifiers)
        }
        None => (levels.join("_"), None, Vec::new()),
    }
}

pub fn flatten_headers(table: &RawTable) -> Vec<FlatColumn> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(source, column)| {
            let (name, field, qualifiers) = flatten_header(&column.header);
            FlatColumn {
                source,
                name,
                field,
                qualifiers,
            }
        })
        .collect()
}

/// Flattened names in order of first appearance, without repeats.
pub fn received_names(columns: &[FlatColumn]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        if !names.contains(&column.name) {
            names.push(column.name.clone());
        }
    }
    names
}

/// Pick one column per field. When several columns carry the same field
/// (multi-ticker tables) the one qualified by `symbol` wins, else the first.
pub fn resolve_fields<'a>(columns: &'a [FlatColumn], symbol: &str) -> HashMap<Field, &'a FlatColumn> {
    let mut resolved: HashMap<Field, &FlatColumn> = HashMap::new();
    for column in columns {
        let Some(field) = column.field else {
            continue;
        };
        let replace = match resolved.get(&field) {
            None => true,
            Some(existing) => qualified_by(column, symbol) && !qualified_by(existing, symbol),
        };
        if replace {
            resolved.insert(field, column);
        }
    }
    resolved
}

fn qualified_by(column: &FlatColumn, symbol: &str) -> bool {
    column.qualifiers.iter().any(|q| q.eq_ignore_ascii_case(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::{Cell, IndexKey};

    #[test]
    fn labels_match_loosely() {
        assert_eq!(Field::from_label("open"), Some(Field::Open));
        assert_eq!(Field::from_label(" CLOSE "), Some(Field::Close));
        assert_eq!(Field::from_label("Adj Close"), Some(Field::AdjClose));
        assert_eq!(Field::from_label("adj_close"), Some(Field::AdjClose));
        assert_eq!(Field::from_label("Ticker"), None);
    }

    #[test]
    fn field_level_wins_regardless_of_position() {
        let (name, field, qualifiers) = flatten_header(&ColumnHeader::multi(["Close", "AAPL"]));
        assert_eq!(name, "Close");
        assert_eq!(field, Some(Field::Close));
        assert_eq!(qualifiers, ["AAPL"]);

        // Ticker-first layout.
        let (name, field, qualifiers) = flatten_header(&ColumnHeader::multi(["AAPL", "High"]));
        assert_eq!(name, "High");
        assert_eq!(field, Some(Field::High));
        assert_eq!(qualifiers, ["AAPL"]);
    }

    #[test]
    fn empty_levels_are_ignored() {
        let (name, field, qualifiers) = flatten_header(&ColumnHeader::multi(["Open", "SPY", ""]));
        assert_eq!(name, "Open");
        assert_eq!(field, Some(Field::Open));
        assert_eq!(qualifiers, ["SPY"]);
    }

    #[test]
    fn unknown_levels_are_joined() {
        let (name, field, _) = flatten_header(&ColumnHeader::multi(["Dividends", "AAPL"]));
        assert_eq!(name, "Dividends_AAPL");
        assert_eq!(field, None);
    }

    #[test]
    fn resolve_prefers_requested_ticker() {
        let table = RawTable::new(vec![IndexKey::Epoch(0)])
            .with_column(ColumnHeader::multi(["Close", "MSFT"]), vec![Cell::Number(1.0)])
            .with_column(ColumnHeader::multi(["Close", "AAPL"]), vec![Cell::Number(2.0)])
            .with_column(ColumnHeader::multi(["Open", "MSFT"]), vec![Cell::Number(3.0)]);
        let flat = flatten_headers(&table);
        let resolved = resolve_fields(&flat, "aapl");

        assert_eq!(resolved[&Field::Close].source, 1);
        // No AAPL open: first one is used.
        assert_eq!(resolved[&Field::Open].source, 2);
        assert_eq!(received_names(&flat), ["Close", "Open"]);
    }
}
