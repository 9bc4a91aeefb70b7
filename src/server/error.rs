//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`hlsrelay_core::Error`]
//! converts with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: hlsrelay_core::Error,
}

impl AppError {
    pub fn new(inner: hlsrelay_core::Error) -> Self {
        Self { inner }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(hlsrelay_core::Error::Validation(message.into()))
    }
}

impl From<hlsrelay_core::Error> for AppError {
    fn from(e: hlsrelay_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let mut body = json!({
            "success": false,
            "error": self.inner.to_string(),
            "code": self.inner.code(),
        });
        if let hlsrelay_core::Error::ProbeFailed(reason) = &self.inner {
            body["reason"] = json!(reason);
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsrelay_core::{FailureKind, FailureReason};

    #[test]
    fn unknown_tier_produces_400() {
        let err = AppError::new(hlsrelay_core::Error::UnknownQualityTier("ultra".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn launch_failure_produces_500() {
        let err = AppError::new(hlsrelay_core::Error::launch_failed("ffmpeg", "not found"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn probe_failure_produces_400() {
        let err = AppError::new(hlsrelay_core::Error::ProbeFailed(FailureReason::new(
            FailureKind::ConnectionRefused,
            "Connection refused",
        )));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
