//! Error taxonomy shared by the pipeline, the server and the CLI.

use crate::data::DataError;
use crate::normalize::NormalizeError;
use crate::render::RenderError;
use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a failure, used for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing request parameters.
    ClientInput,
    /// The provider failed or returned data that could not be used.
    UpstreamData,
    /// Anything else (render failures, worker panics).
    Unclassified,
}

/// Any failure of one chart request.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Missing symbol")]
    MissingSymbol,

    #[error("Invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Provider(#[from] DataError),

    #[error("Chart rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChartError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ChartError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChartError::MissingSymbol | ChartError::InvalidParameter { .. } => ErrorKind::ClientInput,
            ChartError::Normalize(e) => e.kind(),
            ChartError::Provider(DataError::Setup(_)) => ErrorKind::Unclassified,
            ChartError::Provider(_) => ErrorKind::UpstreamData,
            ChartError::Render(_) | ChartError::Internal(_) => ErrorKind::Unclassified,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, ChartError::Normalize(NormalizeError::NoData { .. }))
    }

    /// Columns actually received, for missing-column failures.
    pub fn columns_received(&self) -> Option<&[String]> {
        match self {
            ChartError::Normalize(e) => e.columns_received(),
            _ => None,
        }
    }
}
