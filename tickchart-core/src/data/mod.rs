//! Data providers and the raw tables they return

pub mod circuit_breaker;
pub mod csv_file;
pub mod memory;
pub mod provider;
pub mod table;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_file::CsvDirProvider;
pub use memory::MemoryProvider;
pub use provider::{
    DataError, DataProvider, DataSource, FetchResult, HistoryRequest, Interval, Period,
};
pub use table::{Cell, ColumnHeader, IndexKey, RawColumn, RawTable};
pub use yahoo::{YahooConfig, YahooProvider};
