//! Error taxonomy for the extraction engine.

use std::time::Duration;

use crate::types::{Action, EntityKind, Platform};

/// All errors an extraction call can surface.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("Unsupported URL for {platform}: {url}")]
    UnsupportedUrl { platform: Platform, url: String },

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action {action} is not supported for {platform} {kind} targets")]
    UnsupportedAction {
        platform: Platform,
        kind: EntityKind,
        action: Action,
    },

    #[error("Action {0} requires a target identity")]
    TargetIdentityRequired(Action),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Phase 1 of the retweet check resolved no author. The verifier turns this
    /// into a negative result; it only escapes when called directly.
    #[error("Identity not found for handle {0}")]
    IdentityNotFound(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled")]
    Cancelled,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Stable machine-readable code for transport envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            ScrapeError::UnsupportedUrl { .. } => "E_UNSUPPORTED_URL",
            ScrapeError::UnknownPlatform(_) => "E_UNSUPPORTED_PLATFORM",
            ScrapeError::UnknownAction(_) | ScrapeError::UnsupportedAction { .. } => {
                "E_UNSUPPORTED_ACTION"
            }
            ScrapeError::TargetIdentityRequired(_) => "E_TARGET_REQUIRED",
            ScrapeError::MissingData(_) => "E_MISSING_DATA",
            ScrapeError::InsufficientData(_) => "E_INSUFFICIENT_DATA",
            ScrapeError::IdentityNotFound(_) => "E_IDENTITY_NOT_FOUND",
            ScrapeError::Extraction(_) | ScrapeError::Json(_) => "E_EXTRACTION",
            ScrapeError::Browser(_) => "E_BROWSER",
            ScrapeError::Timeout(_) => "E_TIMEOUT",
            ScrapeError::Cancelled => "E_CANCELLED",
            ScrapeError::InvalidUrl(_) => "E_INVALID_URL",
        }
    }

    /// Whether the caller supplied something the engine can never serve.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScrapeError::UnsupportedUrl { .. }
                | ScrapeError::UnknownPlatform(_)
                | ScrapeError::UnknownAction(_)
                | ScrapeError::UnsupportedAction { .. }
                | ScrapeError::TargetIdentityRequired(_)
                | ScrapeError::InvalidUrl(_)
        )
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(e.to_string())
    }
}

/// Convenience result type.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
