use thiserror::Error;

/// Failure of a single call to the analysis service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service rejected the input (HTTP 400).
    #[error("{0}")]
    Validation(String),

    /// Unknown session or rule set (HTTP 404).
    #[error("{0}")]
    NotFound(String),

    /// The job's status does not allow the operation (HTTP 409).
    #[error("{0}")]
    InvalidState(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response {status}: {body}")]
    Unexpected { status: u16, body: String },

    #[error("preferences: {0}")]
    Preferences(String),
}
