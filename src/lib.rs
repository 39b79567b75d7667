//! Tidepool - resilient music search and a shared playback session.
//!
//! Searches a prioritized list of unreliable third-party mirrors, normalizes
//! their inconsistent JSON into one [`Track`](model::Track) shape, resolves
//! playable stream URLs and drives a single playback session that any
//! number of UI surfaces can observe.
//!
//! Audio decoding and output are not part of this crate: callers supply an
//! [`AudioEngine`](player::AudioEngine) implementation.

pub mod app;
pub mod backends;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod player;
pub mod source;
#[cfg(test)]
pub mod test_utils;

pub use app::Tidepool;
pub use error::{Error, Result};
