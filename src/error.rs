//! Dashboard error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Validation and request errors surfaced to the dashboard user.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("column `{name}` not found, available columns: {available:?}")]
    MissingColumn {
        name: String,
        available: Vec<String>,
    },

    #[error("cannot infer the emissions value column, candidates: {0:?}")]
    AmbiguousValueColumn(Vec<String>),

    #[error("top-N must lie in [{min}, {max}], got {value}")]
    TopNOutOfRange { value: usize, min: usize, max: usize },

    #[error("uploaded file has no column `{0}`")]
    UnknownUploadColumn(String),

    #[error("no CSV file has been uploaded")]
    NoUpload,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl DashboardError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            DashboardError::MissingColumn { .. } => (StatusCode::BAD_REQUEST, "MISSING_COLUMN"),
            DashboardError::AmbiguousValueColumn(_) => {
                (StatusCode::BAD_REQUEST, "AMBIGUOUS_VALUE_COLUMN")
            }
            DashboardError::TopNOutOfRange { .. } => (StatusCode::BAD_REQUEST, "TOP_N_OUT_OF_RANGE"),
            DashboardError::UnknownUploadColumn(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_COLUMN"),
            DashboardError::NoUpload => (StatusCode::NOT_FOUND, "NO_UPLOAD"),
            DashboardError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            DashboardError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{:#}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = DashboardError::TopNOutOfRange {
            value: 40,
            min: 5,
            max: 30,
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            DashboardError::NoUpload.into_response().status(),
            StatusCode::NOT_FOUND
        );
        let internal = DashboardError::from(anyhow::anyhow!("boom"));
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_lists_candidates() {
        let err = DashboardError::AmbiguousValueColumn(vec!["a".into(), "b".into()]);
        assert_eq!(
            err.to_string(),
            "cannot infer the emissions value column, candidates: [\"a\", \"b\"]"
        );
    }
}
