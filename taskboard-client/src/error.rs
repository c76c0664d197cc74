/// Error handling for the API client
///
/// This module provides a unified error type for every operation of the
/// client. Errors are cheap to clone: one in-flight request can be shared by
/// several callers, and all of them receive the same outcome.
///
/// # Taxonomy
///
/// - **Validation**: a form failed client-side checks; nothing was sent
/// - **Unauthenticated / Denied**: no session, or the session role may not
///   perform the action; nothing was sent
/// - **Status / Transport / Decode**: the request was sent and failed
///
/// Users are never shown the difference between the last three; see
/// [`ClientError::user_message`].
///
/// # Example
///
/// ```
/// use taskboard_client::error::ClientError;
///
/// let err = ClientError::Status { status: 503, message: "down".to_string() };
/// assert_eq!(
///     err.user_message("create project"),
///     "Internal server error, failed to create project"
/// );
/// ```

use serde::{Deserialize, Serialize};
use taskboard_shared::auth::authorization::AuthzError;
use taskboard_shared::forms::FormErrors;

/// Client result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// Unified client error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Client-side validation failed (no request issued)
    #[error("{0}")]
    Validation(FormErrors),

    /// An authenticated operation was attempted without a token
    #[error("Not signed in")]
    Unauthenticated,

    /// The session role is not allowed to perform the operation
    #[error("Access denied: {0}")]
    Denied(#[from] AuthzError),

    /// The backend answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never completed (connection, timeout, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Error body the backend sends with failed requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,

    /// Optional error detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClientError {
    /// True for a `401 Unauthorized` response
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status: 401, .. })
    }

    /// True when no request reached the backend
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_)
                | ClientError::Unauthenticated
                | ClientError::Denied(_)
                | ClientError::InvalidRequest(_)
        )
    }

    /// Message suitable for showing next to the form or panel that failed
    ///
    /// Server and transport failures all collapse into one generic message.
    pub fn user_message(&self, action: &str) -> String {
        match self {
            ClientError::Validation(errors) => errors.to_string(),
            ClientError::Unauthenticated => format!("Please sign in to {}", action),
            ClientError::Denied(_) => "Access denied".to_string(),
            ClientError::Status { .. }
            | ClientError::Transport(_)
            | ClientError::Decode(_)
            | ClientError::InvalidRequest(_) => {
                format!("Internal server error, failed to {}", action)
            }
        }
    }
}

impl From<FormErrors> for ClientError {
    fn from(errors: FormErrors) -> Self {
        ClientError::Validation(errors)
    }
}

/// Convert reqwest errors to client errors
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::Decode(err.to_string());
        }
        if err.is_builder() {
            return ClientError::InvalidRequest(err.to_string());
        }
        if let Some(status) = err.status() {
            return ClientError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
