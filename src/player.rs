// Host player contract
// The scrobbler never drives the player, it only listens to it and queries the current media

use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Player state, ordered the way a player walks through it for one media
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Started,
    Playing,
    Paused,
    Stopping,
}

/// Metadata of a media item as reported by the player
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    /// MusicBrainz recording id
    pub recording_id: Option<String>,
    pub track_number: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
    /// Metadata is already available without waiting for playback to start
    pub preparsed: bool,
    pub video_tracks: usize,
}

/// Callbacks invoked by the player, on whatever thread it dispatches events from
pub trait PlayerListener: Send + Sync {
    fn on_state_changed(&self, state: PlaybackState);

    fn on_current_media_changed(&self, media: Option<&MediaItem>);

    /// Periodic update with the playback position of the current media
    fn on_timer_update(&self, position: Duration);
}

/// Handle returned by [`Player::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Player capabilities the scrobbler depends on
pub trait Player: Send + Sync {
    fn current_media(&self) -> Option<MediaItem>;

    fn video_track_count(&self) -> usize;

    fn add_listener(&self, listener: Arc<dyn PlayerListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Listener bookkeeping shared by player implementations
#[derive(Default)]
pub struct Listeners {
    inner: Mutex<ListenersInner>,
}

#[derive(Default)]
struct ListenersInner {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn PlayerListener>)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn PlayerListener>) -> ListenerId {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `f` for every registered listener.
    ///
    /// The registry lock is released before any callback runs, so listeners may query
    /// the player or unregister themselves.
    pub fn for_each(&self, mut f: impl FnMut(&dyn PlayerListener)) {
        let snapshot: Vec<Arc<dyn PlayerListener>> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in &snapshot {
            f(listener.as_ref());
        }
    }
}
