//! JSON response envelope and status-code mapping.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tickchart_core::{ChartError, ChartImage, ErrorKind, StatusPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// Body of every `/chart` response.
///
/// Success: `{"status": "success", "chart": "<base64 PNG>"}`.
/// Failure: `{"status": "error", "message": "..."}`, plus `columns_received`
/// for missing-column failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEnvelope {
    pub status: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns_received: Option<Vec<String>>,
}

impl ChartEnvelope {
    pub fn success(image: &ChartImage) -> Self {
        Self {
            status: Outcome::Success,
            chart: Some(image.to_base64()),
            message: None,
            columns_received: None,
        }
    }

    pub fn error(err: &ChartError) -> Self {
        Self {
            status: Outcome::Error,
            chart: None,
            message: Some(err.to_string()),
            columns_received: err.columns_received().map(<[String]>::to_vec),
        }
    }
}

/// HTTP status for a failure under the given policy.
pub fn error_status(err: &ChartError, policy: StatusPolicy) -> StatusCode {
    match policy {
        StatusPolicy::Envelope => StatusCode::OK,
        StatusPolicy::Http => match err.kind() {
            ErrorKind::ClientInput => StatusCode::BAD_REQUEST,
            ErrorKind::UpstreamData if err.is_no_data() => StatusCode::NOT_FOUND,
            ErrorKind::UpstreamData => StatusCode::BAD_GATEWAY,
            ErrorKind::Unclassified => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickchart_core::data::DataError;
    use tickchart_core::normalize::NormalizeError;

    #[test]
    fn error_envelope_omits_chart() {
        let json = serde_json::to_value(ChartEnvelope::error(&ChartError::MissingSymbol)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "error", "message": "Missing symbol"})
        );
    }

    #[test]
    fn missing_columns_are_listed() {
        let err = ChartError::from(NormalizeError::MissingColumns {
            missing: vec!["Close".into()],
            received: vec!["Open".into(), "High".into()],
        });
        let json = serde_json::to_value(ChartEnvelope::error(&err)).unwrap();
        assert_eq!(json["columns_received"], serde_json::json!(["Open", "High"]));
        assert_eq!(json["message"], "Missing required column(s): Close");
    }

    #[test]
    fn http_policy_maps_kinds() {
        let p = StatusPolicy::Http;
        assert_eq!(error_status(&ChartError::MissingSymbol, p), StatusCode::BAD_REQUEST);
        let no_data = ChartError::from(NormalizeError::NoData { symbol: "X".into() });
        assert_eq!(error_status(&no_data, p), StatusCode::NOT_FOUND);
        let upstream = ChartError::from(DataError::NetworkUnreachable("down".into()));
        assert_eq!(error_status(&upstream, p), StatusCode::BAD_GATEWAY);
        let internal = ChartError::Internal("boom".into());
        assert_eq!(error_status(&internal, p), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_policy_is_always_ok() {
        let err = ChartError::Internal("boom".into());
        assert_eq!(error_status(&err, StatusPolicy::Envelope), StatusCode::OK);
    }
}
