// Submission errors
// Every variant is recoverable: the worker keeps the batch and retries it later

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The payload could not be encoded
    #[error("failed to build payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Connection, TLS or write failure
    #[error("transport error: {0}")]
    Http(#[from] attohttpc::Error),

    /// The request ended without reporting a status
    #[error("no response from server")]
    NoResponse,

    /// HTTP 401, the user token was refused
    #[error("authentication error")]
    Unauthorized,

    #[error("invalid request (HTTP {0})")]
    Rejected(u16),

    #[error("failed to start request thread: {0}")]
    Thread(#[from] std::io::Error),

    /// The request was abandoned because the worker is shutting down
    #[error("submission interrupted")]
    Interrupted,
}

impl SubmitError {
    /// Map a response status to the outcome of a submission
    pub fn check_status(status: u16) -> Result<(), SubmitError> {
        match status {
            200 => Ok(()),
            401 => Err(SubmitError::Unauthorized),
            other => Err(SubmitError::Rejected(other)),
        }
    }
}
