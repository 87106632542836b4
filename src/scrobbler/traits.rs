// Transport seam between the submission worker and the network

use super::error::SubmitError;
use super::listenbrainz::SubmitRequest;

/// Sends one prepared submission and reports the HTTP status code
///
/// Calls block; the worker runs them off its own thread so a hung call can be abandoned.
pub trait Transport: Send + Sync {
    fn send(&self, request: &SubmitRequest) -> Result<u16, SubmitError>;
}
