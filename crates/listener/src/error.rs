//! Rejections raised before a reconciliation starts.

use twin::{Status, STATUS_BAD_REQUEST};

use crate::signature::SignatureError;

/// HTTP status answered when the service account cannot be authenticated.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Errors that end an invocation before the reconciler runs.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The body is not a delivery (`{"event": ..., "labels": ...}`).
    #[error("invalid payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// No registry access token could be obtained.
    #[error("registry authentication failed: {0}")]
    NotAuthenticated(String),
}

impl WebhookError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Signature(_) | Self::InvalidPayload(_) => STATUS_BAD_REQUEST,
            Self::NotAuthenticated(_) => STATUS_UNAUTHORIZED,
        }
    }

    /// Response message; never includes the underlying cause.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Signature(err) => err.message(),
            Self::InvalidPayload(_) => "invalid payload",
            Self::NotAuthenticated(_) => "Not Authenticated",
        }
    }

    pub fn to_status(&self) -> Status {
        Status::new(self.message(), self.status_code())
    }
}
