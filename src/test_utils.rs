//! Test utilities and fixtures for tidepool tests.
//!
//! This module provides common fixtures (backends, response bodies, tracks),
//! a scripted audio engine, and helpers for awaiting session updates.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{MockEngine, next_update, track};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (engine, probe) = MockEngine::new();
//!     // ... build a session around `engine`, assert on `probe.calls()`
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

pub use crate::source::traits::mocks::{MockFetcher, MockResolver, Resolution};

use crate::backends::{BackendEndpoint, ContainerHint};
use crate::model::Track;
use crate::player::{AudioEngine, EngineError, EngineListener, PlaybackState, SessionUpdate};

/// Second backend's body in the "Megadeth" end-to-end scenario.
pub const MEGADETH_SAAVN_BODY: &str = r#"{"data":{"results":[{"id":"1","name":"Symphony of Destruction","artists":{"primary":[{"name":"Megadeth"}]},"image":[{"link":"lo.jpg"},{"link":"hi.jpg"}]}]}}"#;

/// A backend at `https://<id>.example` with a plain search path.
pub fn endpoint(id: &str, priority: u32, container: ContainerHint) -> BackendEndpoint {
    BackendEndpoint {
        id: id.to_string(),
        base_url: format!("https://{}.example", id),
        search_path_template: "/search?q={query}".to_string(),
        priority,
        timeout_ms: 2_000,
        container,
        stream: None,
        album_path_template: None,
    }
}

/// `{"data": [...]}` body with `n` tracks named `"<prefix> track <i>"`.
pub fn tracks_body(prefix: &str, n: usize) -> String {
    let items: Vec<_> = (0..n)
        .map(|i| {
            serde_json::json!({
                "id": format!("{}-{}", prefix, i),
                "title": format!("{} track {}", prefix, i),
                "artist": {"name": "Test Artist"},
                "preview": format!("https://cdn.example/{}-{}.mp3", prefix, i),
            })
        })
        .collect();
    serde_json::json!({ "data": items }).to_string()
}

/// A bare track from the `test` backend.
pub fn track(id: &str) -> Track {
    Track::new("test", id, format!("Track {}", id))
}

/// Every call the session made on a [`MockEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Load(String),
    Start,
    Pause,
    Seek(u64),
    Stop,
    Release,
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<EngineCall>,
    listeners: Vec<EngineListener>,
    position_ms: u64,
    /// Fire `ready` synchronously from `load`
    auto_ready: Option<Option<u64>>,
    fail_load: bool,
}

/// Test-side view of a [`MockEngine`].
#[derive(Clone, Default)]
pub struct EngineProbe {
    inner: Arc<Mutex<ProbeState>>,
}

impl EngineProbe {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.lock().calls.clone()
    }

    /// URLs loaded so far.
    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Load(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Listener handed over with the `n`-th load.
    pub fn listener(&self, n: usize) -> EngineListener {
        self.inner.lock().listeners[n].clone()
    }

    /// Listener of the most recent load.
    pub fn last_listener(&self) -> EngineListener {
        let inner = self.inner.lock();
        inner.listeners[inner.listeners.len() - 1].clone()
    }

    pub fn set_position(&self, position_ms: u64) {
        self.inner.lock().position_ms = position_ms;
    }
}

/// Scripted [`AudioEngine`].
pub struct MockEngine {
    probe: EngineProbe,
}

impl MockEngine {
    /// Engine that waits for the test to fire `ready`.
    pub fn new() -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }

    /// Engine that reports ready as soon as it is loaded.
    pub fn auto_ready(duration_ms: Option<u64>) -> (Self, EngineProbe) {
        let (engine, probe) = Self::new();
        probe.inner.lock().auto_ready = Some(duration_ms);
        (engine, probe)
    }

    /// Engine whose `load` always fails.
    pub fn failing_load() -> (Self, EngineProbe) {
        let (engine, probe) = Self::new();
        probe.inner.lock().fail_load = true;
        (engine, probe)
    }

    fn record(&self, call: EngineCall) {
        self.probe.inner.lock().calls.push(call);
    }
}

impl AudioEngine for MockEngine {
    fn load(&mut self, url: &str, listener: EngineListener) -> Result<(), EngineError> {
        self.record(EngineCall::Load(url.to_string()));
        let mut inner = self.probe.inner.lock();
        if inner.fail_load {
            return Err(EngineError::new("unsupported media"));
        }
        if let Some(duration) = inner.auto_ready {
            listener.ready(duration);
        }
        inner.listeners.push(listener);
        inner.position_ms = 0;
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Start);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Pause);
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), EngineError> {
        self.record(EngineCall::Seek(position_ms));
        self.probe.inner.lock().position_ms = position_ms;
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.probe.inner.lock().position_ms
    }

    fn stop(&mut self) {
        self.record(EngineCall::Stop);
    }

    fn release(&mut self) {
        self.record(EngineCall::Release);
    }
}

/// Next update, failing the test after five seconds.
pub async fn next_update(rx: &mut broadcast::Receiver<SessionUpdate>) -> SessionUpdate {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for session update")
        .expect("session update channel closed")
}

/// Skip updates until one matches `state`, returning it.
pub async fn wait_for_state(
    rx: &mut broadcast::Receiver<SessionUpdate>,
    state: PlaybackState,
) -> SessionUpdate {
    loop {
        let update = next_update(rx).await;
        if update.state == state {
            return update;
        }
    }
}
