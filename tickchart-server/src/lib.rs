//! tickchart server: axum HTTP surface over the chart pipeline.
//!
//! Routes:
//! - `GET /`: plain-text liveness message
//! - `GET /chart?symbol=…[&period=…][&interval=…][&style=…][&volume=…]`: JSON envelope
//!
//! The pipeline blocks (HTTP fetch, rasterization), so each request runs it on
//! tokio's blocking pool. Every failure, including a panicking worker, becomes
//! an error envelope.

pub mod envelope;
pub mod logging;
pub mod state;

pub use envelope::{error_status, ChartEnvelope, Outcome};
pub use logging::init_logging;
pub use state::AppState;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use thiserror::Error;
use tickchart_core::{ChartError, ChartParams, ChartRequest};
use tokio::net::TcpListener;
use tracing::info;

pub const LIVENESS_MESSAGE: &str = "✅ Chart API is running. Use /chart?symbol=AAPL";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/chart", get(chart_handler))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn bind_and_serve(addr: &str, state: AppState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    serve(listener, state).await
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, provider = state.pipeline.provider_name(), "chart server listening");
    }
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

async fn chart_handler(
    State(state): State<AppState>,
    query: Result<Query<ChartParams>, QueryRejection>,
) -> (StatusCode, Json<ChartEnvelope>) {
    let (symbol, result) = match query {
        Ok(Query(params)) => (
            params.symbol.clone().unwrap_or_default(),
            render_chart(&state, params).await,
        ),
        // Malformed query strings still answer with an envelope.
        Err(rejection) => (
            String::new(),
            Err(ChartError::invalid("query", rejection.body_text())),
        ),
    };
    match result {
        Ok(image) => {
            info!(symbol = %image.symbol, bars = image.bars, "chart rendered");
            (StatusCode::OK, Json(ChartEnvelope::success(&image)))
        }
        Err(err) => {
            let status = error_status(&err, state.status_policy);
            info!(symbol = %symbol, kind = ?err.kind(), status = status.as_u16(), error = %err, "chart request failed");
            (status, Json(ChartEnvelope::error(&err)))
        }
    }
}

async fn render_chart(
    state: &AppState,
    params: ChartParams,
) -> Result<tickchart_core::ChartImage, ChartError> {
    let request = ChartRequest::from_params(params, &state.defaults)?;
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || pipeline.run(&request))
        .await
        .map_err(|e| ChartError::Internal(format!("chart worker failed: {e}")))?
}
