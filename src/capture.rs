// Listen capture
// Turns player callbacks into listens and hands finished ones to the submission queue

use crate::listen::Listen;
use crate::player::{MediaItem, PlaybackState, Player, PlayerListener};
use crate::scrobbler::ListenQueue;
use crate::text_cleanup::TextCleaner;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Builds the current listen from player events and queues it when the track ends
pub struct ListenCapture {
    queue: Arc<ListenQueue>,
    player: Arc<dyn Player>,
    text_cleaner: TextCleaner,
}

impl ListenCapture {
    pub fn new(queue: Arc<ListenQueue>, player: Arc<dyn Player>, text_cleaner: TextCleaner) -> Self {
        Self {
            queue,
            player,
            text_cleaner,
        }
    }

    pub fn queue(&self) -> &Arc<ListenQueue> {
        &self.queue
    }

    fn is_video(&self) -> bool {
        self.player.video_track_count() > 0
    }

    /// Convert a media item to a listen; `None` without an artist or a title
    fn media_to_listen(&self, media: &MediaItem) -> Option<Listen> {
        let cleaner = &self.text_cleaner;

        let artist = cleaner
            .clean_field(media.album_artist.as_deref())
            .or_else(|| cleaner.clean_field(media.artist.as_deref()))?;
        let title = cleaner.clean_field(media.title.as_deref())?;

        Some(Listen {
            artist,
            title,
            album: cleaner.clean_field(media.album.as_deref()),
            track_number: cleaner.clean_field(media.track_number.as_deref()),
            recording_id: cleaner.clean_field(media.recording_id.as_deref()),
            duration: media.duration.filter(|d| *d > 0),
            listened_at: Utc::now(),
        })
    }

    /// Capture metadata of `media` as the current listen.
    /// Media without an artist or title is dropped here instead of at enqueue time.
    pub fn populate_current_listen(&self, media: &MediaItem) {
        let listen = self.media_to_listen(media);

        let mut state = self.queue.lock();
        state.current.meta_read = true;

        match listen {
            Some(listen) => {
                log::debug!("Meta data registered: {} - {}", listen.artist, listen.title);
                state.current.listen = Some(listen);
                drop(state);
                self.queue.notify();
            }
            None => {
                log::debug!("Missing artist or title, not tracking this media");
                state.current.listen = None;
            }
        }
    }

    /// Move the current listen into the queue if it qualifies, otherwise discard it
    pub fn enqueue_current_listen(&self) {
        let mut state = self.queue.lock();
        state.current.meta_read = false;

        let Some(mut listen) = state.current.listen.take() else {
            return;
        };

        if let Err(reason) = listen.finalize(state.current.time_played) {
            log::debug!(
                "Not submitting {} - {}: {}",
                listen.artist,
                listen.title,
                reason
            );
            return;
        }

        log::info!(
            "Queued listen: {} - {} (played {}s)",
            listen.artist,
            listen.title,
            state.current.time_played
        );
        state.push(listen);
        drop(state);
        self.queue.notify();
    }
}

impl PlayerListener for ListenCapture {
    fn on_state_changed(&self, state: PlaybackState) {
        if self.is_video() {
            return;
        }

        let meta_read = self.queue.lock().current.meta_read;
        if !meta_read && state >= PlaybackState::Playing {
            if let Some(media) = self.player.current_media() {
                self.populate_current_listen(&media);
            }
            return;
        }

        if state == PlaybackState::Stopped {
            self.enqueue_current_listen();
        }
    }

    fn on_current_media_changed(&self, media: Option<&MediaItem>) {
        self.enqueue_current_listen();

        {
            let mut state = self.queue.lock();
            state.current.meta_read = false;
            state.current.time_played = 0;
        }

        let Some(media) = media else {
            return;
        };
        if self.is_video() {
            return;
        }

        if media.preparsed {
            self.populate_current_listen(media);
        }
    }

    fn on_timer_update(&self, position: Duration) {
        self.queue.lock().current.time_played = position.as_secs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{ListenerId, Listeners};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakePlayer {
        media: Mutex<Option<MediaItem>>,
        listeners: Listeners,
    }

    impl FakePlayer {
        fn set_media(&self, media: Option<MediaItem>) {
            *self.media.lock().unwrap() = media;
        }
    }

    impl Player for FakePlayer {
        fn current_media(&self) -> Option<MediaItem> {
            self.media.lock().unwrap().clone()
        }

        fn video_track_count(&self) -> usize {
            self.media
                .lock()
                .unwrap()
                .as_ref()
                .map_or(0, |m| m.video_tracks)
        }

        fn add_listener(&self, listener: Arc<dyn PlayerListener>) -> ListenerId {
            self.listeners.add(listener)
        }

        fn remove_listener(&self, id: ListenerId) {
            self.listeners.remove(id)
        }
    }

    fn song(artist: &str, title: &str) -> MediaItem {
        MediaItem {
            artist: Some(artist.to_string()),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<FakePlayer>, ListenCapture) {
        let player = Arc::new(FakePlayer::default());
        let capture = ListenCapture::new(
            Arc::new(ListenQueue::new()),
            player.clone(),
            TextCleaner::default(),
        );
        (player, capture)
    }

    /// Load `media`, play it for `seconds` and stop
    fn play(player: &FakePlayer, capture: &ListenCapture, media: MediaItem, seconds: u64) {
        player.set_media(Some(media.clone()));
        capture.on_current_media_changed(Some(&media));
        capture.on_state_changed(PlaybackState::Playing);
        capture.on_timer_update(Duration::from_secs(seconds));
        capture.on_state_changed(PlaybackState::Stopped);
    }

    #[test]
    fn queues_a_track_played_long_enough() {
        let (player, capture) = setup();
        play(&player, &capture, song("X", "Y"), 45);

        let queued = capture.queue().snapshot();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].artist, "X");
        assert_eq!(queued[0].title, "Y");
        assert_eq!(queued[0].duration, Some(45));
        assert!(capture.queue().lock().current.listen.is_none());
    }

    #[test]
    fn discards_a_track_without_artist() {
        let (player, capture) = setup();
        play(&player, &capture, song("", "Y"), 45);
        assert!(capture.queue().is_empty());

        let mut untitled = song("X", "");
        untitled.title = None;
        play(&player, &capture, untitled, 45);
        assert!(capture.queue().is_empty());
    }

    #[test]
    fn discards_a_short_listen() {
        let (player, capture) = setup();
        play(&player, &capture, song("X", "Y"), 29);
        assert!(capture.queue().is_empty());
    }

    #[test]
    fn prefers_album_artist() {
        let (player, capture) = setup();
        let mut media = song("Featured Guest", "Y");
        media.album_artist = Some("Main Artist".to_string());
        media.album = Some("Album [Explicit]".to_string());
        media.duration = Some(200);
        play(&player, &capture, media, 60);

        let queued = capture.queue().snapshot();
        assert_eq!(queued[0].artist, "Main Artist");
        assert_eq!(queued[0].album.as_deref(), Some("Album"));
        assert_eq!(queued[0].duration, Some(200));
    }

    #[test]
    fn inner_cleanup_markers_are_submitted_unchanged() {
        let (player, capture) = setup();
        play(&player, &capture, song("Artist - Cleaner", "Tears - Clean Bandit VIP"), 60);

        let queued = capture.queue().snapshot();
        assert_eq!(queued[0].artist, "Artist - Cleaner");
        assert_eq!(queued[0].title, "Tears - Clean Bandit VIP");
    }

    #[test]
    fn ignores_video() {
        let (player, capture) = setup();
        let mut media = song("X", "Y");
        media.video_tracks = 1;
        play(&player, &capture, media, 120);
        assert!(capture.queue().is_empty());
    }

    #[test]
    fn track_change_queues_the_previous_track() {
        let (player, capture) = setup();

        let first = song("A", "First");
        player.set_media(Some(first.clone()));
        capture.on_current_media_changed(Some(&first));
        capture.on_state_changed(PlaybackState::Playing);
        capture.on_timer_update(Duration::from_secs(95));

        let mut second = song("B", "Second");
        second.preparsed = true;
        player.set_media(Some(second.clone()));
        capture.on_current_media_changed(Some(&second));

        let queued = capture.queue().snapshot();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].title, "First");

        // Preparsed media is captured right away, with a fresh play counter
        let state = capture.queue().lock();
        assert_eq!(
            state.current.listen.as_ref().map(|l| l.title.as_str()),
            Some("Second")
        );
        assert!(state.current.meta_read);
        assert_eq!(state.current.time_played, 0);
    }

    #[test]
    fn repeated_playing_signals_keep_the_first_capture() {
        let (player, capture) = setup();
        let media = song("X", "Y");
        player.set_media(Some(media.clone()));
        capture.on_current_media_changed(Some(&media));
        capture.on_state_changed(PlaybackState::Playing);

        let captured_at = capture.queue().lock().current.listen.as_ref().unwrap().listened_at;
        player.set_media(Some(song("Other", "Metadata")));
        capture.on_state_changed(PlaybackState::Paused);
        capture.on_state_changed(PlaybackState::Playing);

        let state = capture.queue().lock();
        let listen = state.current.listen.as_ref().unwrap();
        assert_eq!(listen.artist, "X");
        assert_eq!(listen.listened_at, captured_at);
    }

    #[test]
    fn stop_without_capture_is_a_no_op() {
        let (_player, capture) = setup();
        capture.on_timer_update(Duration::from_secs(300));
        capture.on_state_changed(PlaybackState::Stopped);
        assert!(capture.queue().is_empty());
    }
}
