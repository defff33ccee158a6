//! Application configuration, loaded from TOML.
//!
//! Every section and field is optional:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 10000
//! status_policy = "http"      # or "envelope"
//!
//! [provider]
//! kind = "yahoo"              # or "csv"
//! csv_dir = "data"
//! timeout_secs = 30
//! max_retries = 0
//!
//! [chart]
//! width = 800
//! height = 600
//! style = "charles"
//! volume = false
//! period = "5d"
//! interval = "1d"
//!
//! [cleaning]
//! policy = "reject"           # or "drop_rows"
//! require_volume = false
//! ```

use crate::chart::{ChartDefaults, ChartPipeline};
use crate::data::{
    CircuitBreaker, CsvDirProvider, DataError, DataProvider, Interval, Period, YahooConfig,
    YahooProvider,
};
use crate::normalize::{CleaningPolicy, Normalizer};
use crate::render::{CandleRenderer, ChartStyle, RenderError, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid chart settings: {0}")]
    Chart(#[from] RenderError),

    #[error("provider setup failed: {0}")]
    Provider(#[from] DataError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub chart: ChartConfig,
    pub cleaning: CleaningConfig,
}

/// How failures map to HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// 400 / 404 / 502 / 500 by error kind.
    #[default]
    Http,
    /// Always 200; the envelope's `status` field carries the outcome.
    Envelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub status_policy: StatusPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 10000,
            status_policy: StatusPolicy::Http,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Csv,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::Yahoo => "yahoo",
            ProviderKind::Csv => "csv",
        })
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "csv" => Ok(ProviderKind::Csv),
            _ => Err(format!("unknown provider '{s}' (valid: yahoo, csv)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub csv_dir: PathBuf,
    /// Overrides the Yahoo chart endpoint (mirrors, local stubs).
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub breaker_threshold: u32,
    pub breaker_cooldown_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Yahoo,
            csv_dir: PathBuf::from("data"),
            base_url: None,
            timeout_secs: 30,
            max_retries: 0,
            breaker_threshold: 3,
            breaker_cooldown_secs: 30 * 60,
        }
    }
}

impl ProviderConfig {
    /// Build the configured provider.
    ///
    /// The Yahoo provider owns a blocking HTTP client, so this must not be
    /// called from inside an async runtime.
    pub fn build(&self) -> Result<Arc<dyn DataProvider>, DataError> {
        match self.kind {
            ProviderKind::Csv => Ok(Arc::new(CsvDirProvider::new(&self.csv_dir))),
            ProviderKind::Yahoo => {
                let mut config = YahooConfig {
                    timeout: Duration::from_secs(self.timeout_secs.max(1)),
                    max_retries: self.max_retries,
                    ..YahooConfig::default()
                };
                if let Some(url) = &self.base_url {
                    config.base_url = url.clone();
                }
                let breaker = Arc::new(CircuitBreaker::new(
                    self.breaker_threshold,
                    Duration::from_secs(self.breaker_cooldown_secs),
                ));
                Ok(Arc::new(YahooProvider::new(config, breaker)?))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub style: ChartStyle,
    pub volume: bool,
    pub period: Period,
    pub interval: Interval,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            style: ChartStyle::default(),
            volume: false,
            period: Period::default(),
            interval: Interval::default(),
        }
    }
}

impl ChartConfig {
    pub fn defaults(&self) -> ChartDefaults {
        ChartDefaults {
            period: self.period,
            interval: self.interval,
            style: self.style,
            volume: self.volume,
        }
    }

    pub fn renderer(&self) -> Result<CandleRenderer, RenderError> {
        CandleRenderer::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub policy: CleaningPolicy,
    pub require_volume: bool,
}

impl CleaningConfig {
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.policy, self.require_volume)
    }
}

impl AppConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Pipeline over an already-built provider.
    pub fn pipeline_with(&self, provider: Arc<dyn DataProvider>) -> Result<ChartPipeline, ConfigError> {
        Ok(ChartPipeline::new(
            provider,
            self.cleaning.normalizer(),
            self.chart.renderer()?,
        ))
    }

    /// Pipeline over the configured provider. Blocking; see [`ProviderConfig::build`].
    pub fn pipeline(&self) -> Result<ChartPipeline, ConfigError> {
        let provider = self.provider.build()?;
        self.pipeline_with(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.address(), "0.0.0.0:10000");
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.provider.max_retries, 0);
        assert_eq!(config.chart.period, Period::FiveDays);
        assert_eq!(config.cleaning.policy, CleaningPolicy::Reject);
    }

    #[test]
    fn sections_override_individually() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 8080
            status_policy = "envelope"

            [provider]
            kind = "csv"
            csv_dir = "/srv/prices"

            [chart]
            style = "nightclouds"
            volume = true
            period = "1mo"

            [cleaning]
            policy = "drop_rows"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.status_policy, StatusPolicy::Envelope);
        assert_eq!(config.provider.kind, ProviderKind::Csv);
        assert_eq!(config.provider.csv_dir, PathBuf::from("/srv/prices"));
        assert_eq!(config.chart.width, 800);
        assert_eq!(config.chart.defaults().style, ChartStyle::Nightclouds);
        assert!(config.chart.defaults().volume);
        assert_eq!(config.chart.period, Period::OneMonth);
        assert_eq!(config.cleaning.normalizer().policy, CleaningPolicy::DropRows);
    }

    #[test]
    fn unknown_enum_values_fail_to_parse() {
        let err = AppConfig::from_toml("[chart]\nstyle = \"neon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bad_dimensions_fail_pipeline_setup() {
        let mut config = AppConfig::default();
        config.chart.width = 0;
        let provider: Arc<dyn DataProvider> = Arc::new(crate::data::MemoryProvider::new());
        assert!(matches!(
            config.pipeline_with(provider),
            Err(ConfigError::Chart(_))
        ));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickchart.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap().server.port, 9000);

        let missing = AppConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn provider_kind_parses() {
        assert_eq!("CSV".parse::<ProviderKind>().unwrap(), ProviderKind::Csv);
        assert!("bloomberg".parse::<ProviderKind>().is_err());
    }
}
