//! Chart pipeline: request parameters → provider → normalizer → renderer.

use crate::data::{DataError, DataProvider, HistoryRequest, Interval, Period};
use crate::error::ChartError;
use crate::normalize::{CleaningReport, NormalizeError, Normalized, Normalizer};
use crate::render::{CandleRenderer, ChartStyle};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

pub const MAX_SYMBOL_LEN: usize = 32;

/// Raw query parameters, all optional and unparsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartParams {
    pub symbol: Option<String>,
    pub period: Option<String>,
    pub interval: Option<String>,
    pub style: Option<String>,
    pub volume: Option<String>,
}

impl ChartParams {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::default()
        }
    }
}

/// Values used when a parameter is not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChartDefaults {
    pub period: Period,
    pub interval: Interval,
    pub style: ChartStyle,
    pub volume: bool,
}

/// A validated chart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub history: HistoryRequest,
    pub style: ChartStyle,
    pub volume: bool,
}

impl ChartRequest {
    pub fn from_params(params: ChartParams, defaults: &ChartDefaults) -> Result<Self, ChartError> {
        let symbol = validate_symbol(params.symbol.as_deref())?;

        let period = match given(&params.period) {
            Some(p) => p.parse::<Period>().map_err(|e| ChartError::invalid("period", e))?,
            None => defaults.period,
        };
        let interval = match given(&params.interval) {
            Some(i) => i.parse::<Interval>().map_err(|e| ChartError::invalid("interval", e))?,
            None => defaults.interval,
        };
        let style = match given(&params.style) {
            Some(s) => s.parse::<ChartStyle>().map_err(|e| ChartError::invalid("style", e))?,
            None => defaults.style,
        };
        let volume = match given(&params.volume) {
            Some(v) => parse_flag(v).ok_or_else(|| {
                ChartError::invalid("volume", format!("expected true or false, got '{v}'"))
            })?,
            None => defaults.volume,
        };

        Ok(Self {
            history: HistoryRequest {
                symbol,
                period,
                interval,
            },
            style,
            volume,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.history.symbol
    }
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn validate_symbol(raw: Option<&str>) -> Result<String, ChartError> {
    let symbol = raw.map(str::trim).unwrap_or_default();
    if symbol.is_empty() {
        return Err(ChartError::MissingSymbol);
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(ChartError::invalid(
            "symbol",
            format!("longer than {MAX_SYMBOL_LEN} characters"),
        ));
    }
    if let Some(bad) = symbol
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '_' | '-')))
    {
        return Err(ChartError::invalid(
            "symbol",
            format!("unexpected character '{bad}'"),
        ));
    }
    Ok(symbol.to_ascii_uppercase())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Rendered chart for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub symbol: String,
    pub bars: usize,
    pub report: CleaningReport,
    pub png: Vec<u8>,
}

impl ChartImage {
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.png)
    }
}

/// Provider → normalizer → renderer.
#[derive(Clone)]
pub struct ChartPipeline {
    provider: Arc<dyn DataProvider>,
    normalizer: Normalizer,
    renderer: CandleRenderer,
}

impl ChartPipeline {
    pub fn new(provider: Arc<dyn DataProvider>, normalizer: Normalizer, renderer: CandleRenderer) -> Self {
        Self {
            provider,
            normalizer,
            renderer,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch and clean without rendering.
    pub fn series(&self, request: &ChartRequest) -> Result<Normalized, ChartError> {
        let symbol = request.symbol();
        tracing::debug!(
            symbol,
            provider = self.provider.name(),
            period = %request.history.period,
            interval = %request.history.interval,
            "Fetching price history"
        );

        let fetched = self.provider.fetch(&request.history).map_err(|e| match e {
            DataError::SymbolNotFound { symbol } => ChartError::from(NormalizeError::NoData { symbol }),
            other => ChartError::from(other),
        })?;

        Ok(self.normalizer.normalize(symbol, &fetched.table)?)
    }

    pub fn run(&self, request: &ChartRequest) -> Result<ChartImage, ChartError> {
        let normalized = self.series(request)?;
        let png = self
            .renderer
            .render(&normalized.series, request.style, request.volume)?;

        Ok(ChartImage {
            symbol: normalized.series.symbol,
            bars: normalized.report.rows_kept,
            report: normalized.report,
            png,
        })
    }
}
