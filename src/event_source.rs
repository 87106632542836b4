// Player event bridge
// A `Player` driven by newline-delimited JSON events, so any host can feed the scrobbler
// through a pipe:
//
//   {"event": "media", "media": {"artist": "X", "title": "Y", "preparsed": true}}
//   {"event": "state", "state": "playing"}
//   {"event": "timer", "position": 31.5}

use crate::player::{ListenerId, Listeners, MediaItem, PlaybackState, Player, PlayerListener};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::BufRead;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PlayerEvent {
    /// The current media changed; `null` when the playlist ran out
    Media { media: Option<MediaItem> },
    State { state: PlaybackState },
    /// Playback position of the current media, in seconds
    Timer { position: f64 },
}

#[derive(Default)]
pub struct EventBridge {
    media: Mutex<Option<MediaItem>>,
    listeners: Listeners,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event and forward it to every listener
    pub fn dispatch(&self, event: PlayerEvent) {
        match event {
            PlayerEvent::Media { media } => {
                *self.media.lock().unwrap_or_else(PoisonError::into_inner) = media.clone();
                self.listeners
                    .for_each(|l| l.on_current_media_changed(media.as_ref()));
            }
            PlayerEvent::State { state } => {
                self.listeners.for_each(|l| l.on_state_changed(state));
            }
            PlayerEvent::Timer { position } => {
                let position = Duration::try_from_secs_f64(position).unwrap_or_default();
                self.listeners.for_each(|l| l.on_timer_update(position));
            }
        }
    }

    /// Read events until end of input. Malformed lines are logged and skipped.
    pub fn run<R: BufRead>(&self, reader: R) -> Result<()> {
        for (index, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read player events")?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<PlayerEvent>(line) {
                Ok(event) => {
                    log::trace!("Player event: {:?}", event);
                    self.dispatch(event);
                }
                Err(e) => log::warn!("Ignoring malformed event on line {}: {}", index + 1, e),
            }
        }

        Ok(())
    }
}

impl Player for EventBridge {
    fn current_media(&self) -> Option<MediaItem> {
        self.media
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn video_track_count(&self) -> usize {
        self.media
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |m| m.video_tracks)
    }

    fn add_listener(&self, listener: Arc<dyn PlayerListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl PlayerListener for Recorder {
        fn on_state_changed(&self, state: PlaybackState) {
            self.events.lock().unwrap().push(format!("state {:?}", state));
        }

        fn on_current_media_changed(&self, media: Option<&MediaItem>) {
            let title = media.and_then(|m| m.title.clone()).unwrap_or_default();
            self.events.lock().unwrap().push(format!("media {}", title));
        }

        fn on_timer_update(&self, position: Duration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("timer {}", position.as_secs()));
        }
    }

    #[test]
    fn parses_each_event_kind() {
        let event: PlayerEvent =
            serde_json::from_str(r#"{"event":"state","state":"paused"}"#).unwrap();
        assert_eq!(event, PlayerEvent::State { state: PlaybackState::Paused });

        let event: PlayerEvent =
            serde_json::from_str(r#"{"event":"timer","position":12.75}"#).unwrap();
        assert_eq!(event, PlayerEvent::Timer { position: 12.75 });

        let event: PlayerEvent =
            serde_json::from_str(r#"{"event":"media","media":null}"#).unwrap();
        assert_eq!(event, PlayerEvent::Media { media: None });
    }

    #[test]
    fn run_dispatches_in_order_and_skips_bad_lines() {
        let bridge = EventBridge::new();
        let recorder = Arc::new(Recorder::default());
        bridge.add_listener(recorder.clone());

        let input = r#"
{"event":"media","media":{"artist":"X","title":"Y","video_tracks":0}}
not json
{"event":"state","state":"playing"}
{"event":"timer","position":-3}
{"event":"timer","position":42.9}
"#;
        bridge.run(input.as_bytes()).unwrap();

        assert_eq!(
            *recorder.events.lock().unwrap(),
            ["media Y", "state Playing", "timer 0", "timer 42"]
        );
        assert_eq!(
            bridge.current_media().and_then(|m| m.artist).as_deref(),
            Some("X")
        );
    }

    #[test]
    fn reports_video_tracks_of_current_media() {
        let bridge = EventBridge::new();
        assert_eq!(bridge.video_track_count(), 0);

        bridge.dispatch(PlayerEvent::Media {
            media: Some(MediaItem {
                video_tracks: 2,
                ..Default::default()
            }),
        });
        assert_eq!(bridge.video_track_count(), 2);
    }
}
