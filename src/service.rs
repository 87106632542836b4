// Scrobbling service
// Wires the listen capture to a player and runs the submission worker behind it

use crate::capture::ListenCapture;
use crate::config::Config;
use crate::player::{ListenerId, Player};
use crate::scrobbler::{Endpoint, HttpTransport, ListenQueue, Submitter, Transport};
use crate::text_cleanup::TextCleaner;
use anyhow::{Context, Result};
use std::sync::Arc;

/// A running ListenBrainz scrobbler attached to one player
pub struct Service {
    player: Arc<dyn Player>,
    listener: ListenerId,
    queue: Arc<ListenQueue>,
    submitter: Submitter,
}

impl Service {
    /// Validate the configuration, subscribe to the player and start submitting over HTTPS
    pub fn start(config: &Config, player: Arc<dyn Player>) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(config.request_timeout()));
        Self::start_with_transport(config, player, transport)
    }

    /// Same as [`Service::start`] with a custom transport
    pub fn start_with_transport(
        config: &Config,
        player: Arc<dyn Player>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let endpoint = Endpoint::from_config(config);
        let queue = Arc::new(ListenQueue::new());

        let submitter = Submitter::spawn(
            Arc::clone(&queue),
            transport,
            endpoint.clone(),
            config.retry_interval(),
        )
        .context("Failed to start submission worker")?;

        let capture = Arc::new(ListenCapture::new(
            Arc::clone(&queue),
            Arc::clone(&player),
            TextCleaner::new(&config.cleanup),
        ));
        let listener = player.add_listener(capture);

        log::info!("{}: Submitting listens to {}", endpoint.name, endpoint.url);

        Ok(Self {
            player,
            listener,
            queue,
            submitter,
        })
    }

    pub fn queue(&self) -> &Arc<ListenQueue> {
        &self.queue
    }

    /// Stop the worker, waiting for it to exit, then detach from the player.
    /// Listens not yet submitted are lost.
    pub fn close(self) {
        self.submitter.shutdown();
        self.player.remove_listener(self.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_source::{EventBridge, PlayerEvent};
    use crate::player::{MediaItem, PlaybackState};
    use crate::scrobbler::{SubmitError, SubmitRequest};
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<SubmitRequest>>,
    }

    impl Transport for RecordingTransport {
        fn send(&self, request: &SubmitRequest) -> Result<u16, SubmitError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(200)
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.listenbrainz.token = "secret".to_string();
        config
    }

    #[test]
    fn start_fails_without_token() {
        let player = Arc::new(EventBridge::new());
        assert!(Service::start(&Config::default(), player).is_err());
    }

    #[test]
    fn submits_a_played_track_end_to_end() {
        let player = Arc::new(EventBridge::new());
        let transport = Arc::new(RecordingTransport::default());
        let service =
            Service::start_with_transport(&config(), player.clone(), transport.clone()).unwrap();

        player.dispatch(PlayerEvent::Media {
            media: Some(MediaItem {
                artist: Some("X".to_string()),
                title: Some("Y".to_string()),
                recording_id: Some("0a1b2c3d-0000-4000-8000-000000000000".to_string()),
                ..Default::default()
            }),
        });
        player.dispatch(PlayerEvent::State {
            state: PlaybackState::Playing,
        });
        player.dispatch(PlayerEvent::Timer { position: 45.0 });
        player.dispatch(PlayerEvent::State {
            state: PlaybackState::Stopped,
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while transport.requests.lock().unwrap().is_empty() || !service.queue().is_empty() {
            assert!(Instant::now() < deadline, "no submission");
            thread::sleep(Duration::from_millis(5));
        }

        let request = transport.requests.lock().unwrap()[0].clone();
        assert_eq!(request.url, "https://api.listenbrainz.org/1/submit-listens");
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["listen_type"], "single");
        assert_eq!(body["payload"][0]["track_metadata"]["artist_name"], "X");
        assert_eq!(
            body["payload"][0]["track_metadata"]["additional_info"]["recording_mbid"],
            "0a1b2c3d-0000-4000-8000-000000000000"
        );

        service.close();
        assert!(player.current_media().is_some());
    }
}
