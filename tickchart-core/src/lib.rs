//! tickchart core: price tables, providers, normalization, candlestick rendering.
//!
//! This crate contains everything behind the chart endpoint:
//! - Raw provider tables (multi-level headers, untrusted cells)
//! - Data providers (Yahoo Finance, CSV exports, in-memory) with a circuit breaker
//! - The normalization pipeline that turns a raw table into a clean `PriceSeries`
//! - A PNG candlestick renderer
//! - The chart pipeline tying them together, plus configuration and errors

pub mod chart;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod render;

pub use chart::{ChartDefaults, ChartImage, ChartParams, ChartPipeline, ChartRequest};
pub use config::{AppConfig, ConfigError, StatusPolicy};
pub use error::{ChartError, ErrorKind};
