//! Captures listens from media player events and submits them to ListenBrainz.
//!
//! A [`service::Service`] subscribes a [`capture::ListenCapture`] to a host
//! [`player::Player`]. Finished tracks that were played for at least
//! [`listen::MIN_LISTEN_SECONDS`] are queued, and a single background worker submits the
//! queue as one batch, retrying the whole batch after a fixed backoff when it fails.

pub mod capture;
pub mod config;
pub mod event_source;
pub mod listen;
pub mod player;
pub mod scrobbler;
pub mod service;
pub mod text_cleanup;
