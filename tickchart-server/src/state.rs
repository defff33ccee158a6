use std::sync::Arc;

use tickchart_core::{AppConfig, ChartDefaults, ChartPipeline, ConfigError, StatusPolicy};
use tickchart_core::data::DataProvider;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChartPipeline>,
    pub defaults: ChartDefaults,
    pub status_policy: StatusPolicy,
}

impl AppState {
    pub fn new(pipeline: ChartPipeline, defaults: ChartDefaults, status_policy: StatusPolicy) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            defaults,
            status_policy,
        }
    }

    /// State over an already-built provider, everything else from config.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn DataProvider>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.pipeline_with(provider)?,
            config.chart.defaults(),
            config.server.status_policy,
        ))
    }
}
