/// Client error type
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection, TLS or body decoding failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    /// Refresh failed or the retried request was refused again; the session
    /// has been cleared
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Request body could not be encoded
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// A task update without any field set
    #[error("No fields to update")]
    EmptyUpdate,

    /// The base URL could not be joined with a path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::SessionExpired => Some(StatusCode::UNAUTHORIZED),
            ClientError::Http(e) => e.status(),
            ClientError::Encode(_) | ClientError::EmptyUpdate | ClientError::InvalidUrl(_) => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
