use chrono::{DateTime, Utc};

/// Watch state of an episode for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WatchState {
    #[default]
    Unwatched,
    InProgress,
    Watched,
}

/// Per-user watch statistics for a single episode.
///
/// The default record is what a missing record means: never played.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchRecord {
    pub watched: bool,
    pub in_progress: bool,
    pub play_count: u32,
    pub last_watched_at: Option<DateTime<Utc>>,
}

impl WatchRecord {
    pub fn watched(play_count: u32, last_watched_at: DateTime<Utc>) -> Self {
        Self {
            watched: true,
            in_progress: false,
            play_count,
            last_watched_at: Some(last_watched_at),
        }
    }

    pub fn in_progress(last_watched_at: DateTime<Utc>) -> Self {
        Self {
            watched: false,
            in_progress: true,
            play_count: 0,
            last_watched_at: Some(last_watched_at),
        }
    }

    pub fn state(&self) -> WatchState {
        if self.watched {
            WatchState::Watched
        } else if self.in_progress {
            WatchState::InProgress
        } else {
            WatchState::Unwatched
        }
    }
}
