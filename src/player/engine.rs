//! Boundary to the external audio engine.
//!
//! Decoding and rendering live outside this crate. The session drives an
//! engine through [`AudioEngine`] and learns about buffering, completion
//! and failures through the [`EngineListener`] handed over with each load.
//! A listener is bound to one load: events fired through a listener from
//! an earlier load are ignored by the session.

use tokio::sync::mpsc::UnboundedSender;

use super::session::Message;

/// Failure reported by the audio engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Engine error: {0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Asynchronous notifications from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Media buffered and ready to start
    Ready { duration_ms: Option<u64> },
    /// Reached end of media
    Ended,
    /// Playback failed
    Failed(EngineError),
}

/// Callback handle given to the engine for one load.
#[derive(Debug, Clone)]
pub struct EngineListener {
    generation: u64,
    tx: UnboundedSender<Message>,
}

impl EngineListener {
    pub(crate) fn new(generation: u64, tx: UnboundedSender<Message>) -> Self {
        Self { generation, tx }
    }

    /// Report an event. Safe to call from any thread; a closed session is ignored.
    pub fn notify(&self, event: EngineEvent) {
        let _ = self.tx.send(Message::Engine {
            generation: self.generation,
            event,
        });
    }

    pub fn ready(&self, duration_ms: Option<u64>) {
        self.notify(EngineEvent::Ready { duration_ms });
    }

    pub fn ended(&self) {
        self.notify(EngineEvent::Ended);
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.notify(EngineEvent::Failed(EngineError::new(reason)));
    }
}

/// An audio engine instance, exclusively owned by one session.
///
/// Methods are called from the session task only.
pub trait AudioEngine: Send + 'static {
    /// Start buffering `url`. Readiness is reported through `listener`.
    fn load(&mut self, url: &str, listener: EngineListener) -> Result<(), EngineError>;

    /// Start or resume output.
    fn start(&mut self) -> Result<(), EngineError>;

    fn pause(&mut self) -> Result<(), EngineError>;

    fn seek(&mut self, position_ms: u64) -> Result<(), EngineError>;

    /// Current playback position.
    fn position_ms(&self) -> u64;

    /// Drop the current media, if any.
    fn stop(&mut self);

    /// Free engine resources; no further calls follow.
    fn release(&mut self);
}
