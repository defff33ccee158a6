//! Yahoo Finance data provider.
//!
//! Fetches OHLCV history from Yahoo's v8 chart API using the `range` and
//! `interval` parameters. Handles bans and rate limiting through the circuit
//! breaker and retries with exponential backoff when configured to.
//!
//! Quote arrays are read as loose JSON so a malformed cell reaches the
//! normalizer as text instead of failing the whole response.
//!
//! Daily bars are stamped at the exchange session open. When the response
//! carries the exchange's `gmtoffset`, timestamps become the exchange-local
//! trading date; otherwise they stay epoch seconds.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, DataSource, FetchResult, HistoryRequest};
use super::table::{Cell, ColumnHeader, IndexKey, RawTable};
use chrono::DateTime;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Upper bound on a single retry sleep.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Quote keys in the order their columns are emitted, with the header used.
const QUOTE_COLUMNS: [(&str, &str); 5] = [
    ("open", "Open"),
    ("high", "High"),
    ("low", "Low"),
    ("close", "Close"),
    ("volume", "Volume"),
];

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Map<String, Value>>,
    adjclose: Option<Vec<Map<String, Value>>>,
}

/// Connection settings for [`YahooProvider`].
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub user_agent: String,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    config: YahooConfig,
}

impl YahooProvider {
    /// Build the provider. Must be called outside an async runtime: the
    /// blocking client owns its own.
    pub fn new(config: YahooConfig, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Setup(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            config,
        })
    }

    /// Build the chart API URL for a request.
    fn chart_url(&self, request: &HistoryRequest) -> Result<Url, DataError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| DataError::Setup(format!("invalid base URL '{}': {e}", self.config.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| DataError::Setup(format!("base URL cannot take a path: {}", self.config.base_url)))?
            .push(&request.symbol);
        url.query_pairs_mut()
            .append_pair("range", request.period.as_str())
            .append_pair("interval", request.interval.as_str())
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }

    fn breaker_open(&self) -> DataError {
        DataError::CircuitBreakerTripped {
            remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
        }
    }

    /// Execute the HTTP request with retry and circuit breaker logic.
    fn fetch_with_retry(&self, request: &HistoryRequest) -> Result<RawTable, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(self.breaker_open());
        }

        let symbol = request.symbol.as_str();
        let url = self.chart_url(request)?;
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.config.base_delay, attempt);
                tracing::warn!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying Yahoo request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(self.breaker_open());
            }

            tracing::debug!(%url, "requesting Yahoo chart");
            let resp = match self.client.get(url.clone()).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(self.breaker_open());
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }

            // Unknown symbols come back as 404 with a JSON error body.
            if status == reqwest::StatusCode::NOT_FOUND {
                return match resp.json::<ChartResponse>() {
                    Ok(chart) => parse_response(symbol, chart),
                    Err(_) => Err(DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }),
                };
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
            })?;

            let table = parse_response(symbol, chart)?;
            self.circuit_breaker.record_success();
            return Ok(table);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// Exponential backoff before retry `attempt` (1-based), capped.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Turn a decoded chart response into a raw table.
///
/// Missing `timestamp` means Yahoo knows the symbol but has no bars for the
/// range; that yields an empty table rather than an error.
fn parse_response(symbol: &str, resp: ChartResponse) -> Result<RawTable, DataError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
        (None, Some(err)) => {
            return Err(DataError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )))
        }
        (None, None) => {
            return Err(DataError::ResponseFormatChanged(
                "empty result with no error".into(),
            ))
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(RawTable::default());
    };

    let offset = data.meta.gmtoffset;
    let index: Vec<IndexKey> = data
        .timestamp
        .unwrap_or_default()
        .into_iter()
        .map(|ts| index_key(ts, offset))
        .collect();
    let mut table = RawTable::new(index);

    if let Some(quote) = data.indicators.quote.into_iter().next() {
        for (key, header) in QUOTE_COLUMNS {
            if let Some(values) = quote.get(key) {
                table.push_column(ColumnHeader::single(header), cells_from(key, values)?);
            }
        }
    }

    if let Some(values) = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .and_then(|mut m| m.remove("adjclose"))
    {
        table.push_column(ColumnHeader::single("Adj Close"), cells_from("adjclose", &values)?);
    }

    Ok(table)
}

/// Exchange-local trading date for a bar timestamp, when the offset is known.
fn index_key(ts: i64, gmtoffset: Option<i64>) -> IndexKey {
    gmtoffset
        .and_then(|offset| ts.checked_add(offset))
        .and_then(|local| DateTime::from_timestamp(local, 0))
        .map(|dt| IndexKey::Text(dt.date_naive().to_string()))
        .unwrap_or(IndexKey::Epoch(ts))
}

fn cells_from(key: &str, values: &Value) -> Result<Vec<Cell>, DataError> {
    match values {
        Value::Array(items) => Ok(items.iter().map(Cell::from_json).collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(DataError::ResponseFormatChanged(format!(
            "quote field '{key}' is not an array: {other}"
        ))),
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, request: &HistoryRequest) -> Result<FetchResult, DataError> {
        let table = self.fetch_with_retry(request)?;
        tracing::debug!(
            symbol = %request.symbol,
            rows = table.row_count(),
            columns = table.columns.len(),
            "Yahoo response parsed"
        );
        Ok(FetchResult {
            symbol: request.symbol.clone(),
            table,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
