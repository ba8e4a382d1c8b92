//! Transport errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use socialtap::ScrapeError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Scrape(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Scrape(ScrapeError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Scrape(ScrapeError::Browser(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Scrape(ScrapeError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Scrape(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "E_INVALID_PARAMS",
            ApiError::Unauthorized => "E_UNAUTHORIZED",
            ApiError::RateLimited => "E_RATE_LIMITED",
            ApiError::Scrape(e) => e.code(),
            ApiError::Internal(_) => "E_INTERNAL",
        }
    }

    /// `{success: false, error, code}` envelope shared by HTTP and WebSocket.
    pub fn envelope(&self) -> serde_json::Value {
        json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use socialtap::{Action, EntityKind, Platform};
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let unsupported = ApiError::from(ScrapeError::UnsupportedAction {
            platform: Platform::Tiktok,
            kind: EntityKind::Post,
            action: Action::GetPosts,
        });
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);
        assert_eq!(unsupported.code(), "E_UNSUPPORTED_ACTION");

        let timeout = ApiError::from(ScrapeError::Timeout(Duration::from_secs(60)));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let missing = ApiError::from(ScrapeError::MissingData("data.user".into()));
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.envelope()["error"], "Missing data: data.user");
    }
}
