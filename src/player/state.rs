//! Session state, published updates and command types.

use std::fmt;
use std::time::Duration;

use super::engine::EngineError;
use crate::model::Track;
use crate::source::StreamError;

/// Why the session entered [`PlaybackState::Error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackFailure {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Current playback state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Error(PlaybackFailure),
}

impl PlaybackState {
    /// States in which the engine holds a loaded track.
    pub fn has_loaded_track(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackState::Error(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => f.write_str("Idle"),
            PlaybackState::Loading => f.write_str("Loading"),
            PlaybackState::Ready => f.write_str("Ready"),
            PlaybackState::Playing => f.write_str("Playing"),
            PlaybackState::Paused => f.write_str("Paused"),
            PlaybackState::Error(reason) => write!(f, "Error({})", reason),
        }
    }
}

/// One position sample, emitted once per clock tick while playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub position_ms: u64,
    /// Known once the engine reported ready
    pub duration_ms: Option<u64>,
}

/// What observers receive on every transition and every progress tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub state: PlaybackState,
    /// Track the state refers to
    pub track: Option<Track>,
    /// Set from `Ready` onwards
    pub duration_ms: Option<u64>,
    /// Only set on progress ticks
    pub progress: Option<ProgressSample>,
}

/// Format a duration as MM:SS or HH:MM:SS.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Transport commands sent to the session task.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Resolve and play a track
    Play(Track),
    /// Pause playback
    Pause,
    /// Resume paused playback
    Resume,
    /// Pause when playing, resume when paused
    TogglePlayPause,
    /// Seek to an absolute position in milliseconds
    SeekTo(u64),
    /// Play the next track of the active list
    SkipNext,
    /// Play the previous track of the active list
    SkipPrev,
    /// Replace the active list
    SetTracks(Vec<Track>),
}
