/// Unified error types for the Kizuna linker service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the linker
#[derive(Error, Debug)]
pub enum LinkerError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed input schema
    #[error("Validation error: {0}")]
    Validation(String),

    /// Site, user, link or request absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// No matching link in the required state for the exact pair
    #[error("No link found for discord {discord_id} / wikidot {wikidot_id}")]
    LinkNotFound { discord_id: String, wikidot_id: i64 },

    /// Duplicate creation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Wikidot account already actively linked to another Discord identity
    #[error("Wikidot account {wikidot_id} is already linked to another Discord account")]
    ConflictingLink { wikidot_id: i64 },

    /// Link exists but is unlinked; history must be resurrected explicitly
    #[error("Link for discord {discord_id} / wikidot {wikidot_id} is unlinked, use relink")]
    UseRelinkInstead { discord_id: String, wikidot_id: i64 },

    /// Insufficient permission level
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Privilege action invalid for the member's current state
    #[error("Invalid privilege action '{action}': {reason}")]
    InvalidPrivilegeAction { action: String, reason: String },

    /// Unknown PKCE code challenge method
    #[error("Invalid code challenge method: {0}")]
    InvalidMethod(String),

    /// Upstream identity-provider failure or timeout (retryable)
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// No pending flow for the presented state token
    #[error("No pending flow for the given state")]
    FlowNotFound,

    /// A completed flow callback was presented a second time
    #[error("Flow callback was already consumed")]
    ReplayedCallback,

    /// Missing or invalid API credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LinkerError {
    /// Whether a caller may reasonably retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LinkerError::IdentityProvider(_))
    }
}

/// Error response body shared by all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert LinkerError to HTTP response
impl IntoResponse for LinkerError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            LinkerError::Validation(_) | LinkerError::InvalidMethod(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            LinkerError::NotFound(_)
            | LinkerError::LinkNotFound { .. }
            | LinkerError::FlowNotFound => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            LinkerError::Conflict(_)
            | LinkerError::ConflictingLink { .. }
            | LinkerError::UseRelinkInstead { .. }
            | LinkerError::ReplayedCallback => {
                (StatusCode::CONFLICT, "Conflict", self.to_string())
            }
            LinkerError::Forbidden(_) | LinkerError::InvalidPrivilegeAction { .. } => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            LinkerError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            LinkerError::IdentityProvider(_) => (
                StatusCode::BAD_GATEWAY,
                "IdentityProviderError",
                self.to_string(),
            ),
            LinkerError::Database(_) | LinkerError::Io(_) | LinkerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for linker operations
pub type LinkerResult<T> = Result<T, LinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(LinkerError::IdentityProvider("timeout".into()).is_retryable());
        assert!(!LinkerError::FlowNotFound.is_retryable());
        assert!(!LinkerError::Conflict("dup".into()).is_retryable());
    }
}
