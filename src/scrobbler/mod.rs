// Scrobbler module
// Listen queue, ListenBrainz payloads and the background submission worker

pub mod error;
pub mod listenbrainz;
pub mod queue;
pub mod traits;
pub mod worker;

pub use error::SubmitError;
pub use listenbrainz::{Endpoint, HttpTransport, SubmitRequest};
pub use queue::{ListenQueue, WorkerState};
pub use traits::Transport;
pub use worker::{InterruptHandle, Submitter};
