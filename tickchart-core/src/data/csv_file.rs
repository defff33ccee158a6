//! CSV directory provider.
//!
//! Serves `<dir>/<SYMBOL>.csv` files as exported by dataframe tools. Plain
//! exports have one header row (`Date,Open,High,Low,Close,Adj Close,Volume`);
//! multi-ticker exports stack two or three header rows:
//!
//! ```text
//! Price,Close,High,Low,Open,Volume
//! Ticker,AAPL,AAPL,AAPL,AAPL,AAPL
//! Date,,,,,
//! 2024-01-02,185.64,188.44,183.89,187.15,82488700
//! ```
//!
//! The first column is always the row index. The first row is always a header;
//! up to two more follow while a row has neither a digit-led index nor a
//! numeric data cell. Rows are served as-is; the file is the requested window.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, HistoryRequest};
use super::table::{Cell, ColumnHeader, IndexKey, RawTable};
use std::io::Read;
use std::path::PathBuf;

const MAX_HEADER_ROWS: usize = 3;

/// Provider reading per-symbol CSV exports from a directory.
#[derive(Debug, Clone)]
pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Locate the file for a symbol, trying the name as given then upper-cased.
    fn symbol_path(&self, symbol: &str) -> Option<PathBuf> {
        if symbol.is_empty() || symbol.contains(['/', '\\']) || symbol.contains("..") {
            return None;
        }
        [symbol.to_string(), symbol.to_ascii_uppercase()]
            .into_iter()
            .map(|name| self.dir.join(format!("{name}.csv")))
            .find(|p| p.is_file())
    }
}

/// Parse CSV text (from any reader) into a raw table.
pub fn read_table<R: Read>(reader: R) -> Result<RawTable, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut header_rows: Vec<csv::StringRecord> = Vec::new();
    let mut data_rows: Vec<csv::StringRecord> = Vec::new();

    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let is_header = header_rows.is_empty()
            || (data_rows.is_empty()
                && header_rows.len() < MAX_HEADER_ROWS
                && !looks_like_data(&record));
        if is_header {
            header_rows.push(record);
        } else {
            data_rows.push(record);
        }
    }

    let width = header_rows
        .iter()
        .chain(data_rows.iter())
        .map(|r| r.len())
        .max()
        .unwrap_or(0);

    let index = data_rows
        .iter()
        .map(|r| IndexKey::Text(r.get(0).unwrap_or("").to_string()))
        .collect();
    let mut table = RawTable::new(index);

    for col in 1..width {
        let levels: Vec<&str> = header_rows.iter().map(|r| r.get(col).unwrap_or("")).collect();
        let header = if levels.len() == 1 {
            ColumnHeader::single(levels[0])
        } else {
            ColumnHeader::multi(levels)
        };
        let cells = data_rows
            .iter()
            .map(|r| Cell::from_field(r.get(col).unwrap_or("")))
            .collect();
        table.push_column(header, cells);
    }

    Ok(table)
}

fn looks_like_data(record: &csv::StringRecord) -> bool {
    let index_is_numeric = record
        .get(0)
        .and_then(|s| s.chars().next())
        .is_some_and(|c| c.is_ascii_digit());
    let has_number = record
        .iter()
        .skip(1)
        .any(|f| f.parse::<f64>().is_ok_and(f64::is_finite));
    index_is_numeric || has_number
}

impl DataProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv_dir"
    }

    fn fetch(&self, request: &HistoryRequest) -> Result<FetchResult, DataError> {
        let path = self
            .symbol_path(&request.symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: request.symbol.clone(),
            })?;

        let unreadable = |reason: String| DataError::SourceUnreadable {
            path: path.display().to_string(),
            reason,
        };
        let file = std::fs::File::open(&path).map_err(|e| unreadable(e.to_string()))?;
        let table = read_table(file).map_err(|e| unreadable(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            rows = table.row_count(),
            multi_level = table.has_multi_level_headers(),
            "CSV export loaded"
        );

        Ok(FetchResult {
            symbol: request.symbol.clone(),
            table,
            source: DataSource::CsvFile,
        })
    }
}
