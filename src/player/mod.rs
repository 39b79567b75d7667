//! Playback session driving an external audio engine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  PlaybackSession (handle)                       │
//! │   play / pause / seek / skip, observe_state, snapshot           │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ mpsc commands
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Session task (tokio)                         │
//! │  state machine, play queue, progress clock, load generations    │
//! └──────────────┬─────────────────────────────────┬────────────────┘
//!                │ TrackResolver                   │ AudioEngine
//!                ▼                                 ▼
//!        stream URL lookup               buffering / output, reports
//!                                        back through EngineListener
//! ```

mod clock;
mod engine;
mod queue;
mod session;
mod state;

pub use clock::{DEFAULT_INTERVAL, ProgressClock};
pub use engine::{AudioEngine, EngineError, EngineEvent, EngineListener};
pub use queue::PlayQueue;
pub use session::{PlaybackSession, SessionOptions};
pub use state::{
    PlaybackFailure, PlaybackState, ProgressSample, SessionCommand, SessionUpdate,
    format_duration,
};

/// Session handle errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Playback session closed")]
    Closed,
}
