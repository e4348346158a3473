//! Failure taxonomy for YouTube Data API calls.

use http::StatusCode;

/// Errors produced while talking to the YouTube Data API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The API key's daily quota is used up (the API answers `403 Forbidden`).
    ///
    /// Retried with the next key from the pool.
    #[error("API key quota exceeded")]
    QuotaExceeded,

    /// Any other non-success HTTP status.
    #[error("YouTube API request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request never produced an HTTP response.
    #[error("send request to YouTube API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("parse YouTube API response as JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The API answered successfully but the requested resource was not in it.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Every key in the pool was tried and none of them succeeded.
    #[error("failed after {attempts} attempts, last error: {last}")]
    Exhausted { attempts: usize, last: String },
}

impl ApiError {
    /// Classifies a non-success HTTP response.
    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        if status == StatusCode::FORBIDDEN {
            Self::QuotaExceeded
        } else {
            Self::Status {
                status,
                body: body.into(),
            }
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
