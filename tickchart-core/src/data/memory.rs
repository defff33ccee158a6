//! In-memory provider: a fixed symbol → table map. Used by tests and demos.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, HistoryRequest};
use super::table::RawTable;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider answering from a prepared map, or failing with a fixed message.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    tables: HashMap<String, RawTable>,
    failure: Option<String>,
    fetches: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table for a symbol (matched case-insensitively).
    pub fn with_table(mut self, symbol: &str, table: RawTable) -> Self {
        self.tables.insert(symbol.to_ascii_uppercase(), table);
        self
    }

    /// Make every fetch fail with `DataError::NetworkUnreachable(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of fetches served so far (including failed ones).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, request: &HistoryRequest) -> Result<FetchResult, DataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(DataError::NetworkUnreachable(message.clone()));
        }
        let table = self
            .tables
            .get(&request.symbol.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: request.symbol.clone(),
            })?;
        Ok(FetchResult {
            symbol: request.symbol.clone(),
            table,
            source: DataSource::Memory,
        })
    }
}
