// Listen records
// A listen is one track played long enough to be submitted

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Minimum listened time in seconds before a track counts as a listen
pub const MIN_LISTEN_SECONDS: u64 = 30;

/// A captured listen, waiting to be queued or already queued for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listen {
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub track_number: Option<String>,
    pub recording_id: Option<String>,
    /// Track duration in seconds, if the media reported one
    pub duration: Option<u64>,
    pub listened_at: DateTime<Utc>,
}

/// Why a captured listen was not queued
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("missing artist")]
    MissingArtist,
    #[error("missing title")]
    MissingTitle,
    #[error("listened for {played}s, need at least {}s", MIN_LISTEN_SECONDS)]
    TooShort { played: u64 },
}

impl Listen {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            album: None,
            track_number: None,
            recording_id: None,
            duration: None,
            listened_at: Utc::now(),
        }
    }

    /// Check that the listen has the mandatory metadata and was played long enough.
    ///
    /// An unknown duration is filled in with the listened time, since it is the best
    /// lower bound available.
    pub fn finalize(&mut self, time_played: u64) -> Result<(), Rejection> {
        if self.artist.is_empty() {
            return Err(Rejection::MissingArtist);
        }
        if self.title.is_empty() {
            return Err(Rejection::MissingTitle);
        }

        self.duration.get_or_insert(time_played);

        if time_played < MIN_LISTEN_SECONDS {
            return Err(Rejection::TooShort { played: time_played });
        }

        Ok(())
    }
}

/// The in-progress listen of the track currently loaded in the player
#[derive(Debug, Default)]
pub struct CurrentListen {
    /// `None` until metadata for the current track has been captured
    pub listen: Option<Listen>,
    /// Set once metadata was read for the current track
    pub meta_read: bool,
    /// Playback position of the current track, in whole seconds
    pub time_played: u64,
}

impl CurrentListen {
    /// Drop any captured listen and forget the current track's progress
    pub fn reset(&mut self) {
        self.listen = None;
        self.meta_read = false;
        self.time_played = 0;
    }
}
