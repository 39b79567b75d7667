//! The playback session: one background task that owns the engine.
//!
//! Every input (transport commands, stream resolutions, engine callbacks,
//! clock ticks) is a [`Message`] on a single channel, so all state
//! transitions happen on one logical context and observers see them in
//! order. Each `play` starts a new load generation; results stamped with
//! an older generation are dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::SessionError;
use super::clock::ProgressClock;
use super::engine::{AudioEngine, EngineEvent, EngineListener};
use super::queue::PlayQueue;
use super::state::{PlaybackFailure, PlaybackState, ProgressSample, SessionCommand, SessionUpdate};
use crate::model::Track;
use crate::source::{StreamError, TrackResolver};

/// Everything the session task reacts to.
#[derive(Debug)]
pub(crate) enum Message {
    Command(SessionCommand),
    Resolved {
        generation: u64,
        result: Result<Track, StreamError>,
    },
    Engine {
        generation: u64,
        event: EngineEvent,
    },
    Tick {
        generation: u64,
    },
    Shutdown(Option<oneshot::Sender<()>>),
}

/// Session tuning.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// How often progress is sampled while playing
    pub progress_interval: Duration,
    /// Updates buffered per observer before the slowest one lags
    pub event_buffer: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            progress_interval: super::clock::DEFAULT_INTERVAL,
            event_buffer: 64,
        }
    }
}

/// Handle to a running playback session.
///
/// Control methods only enqueue a command and return immediately; the
/// outcome is observed through [`observe_state`](Self::observe_state).
pub struct PlaybackSession {
    tx: mpsc::UnboundedSender<Message>,
    updates: broadcast::Sender<SessionUpdate>,
    snapshot: Arc<RwLock<SessionUpdate>>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Spawn the session task. Must be called within a tokio runtime.
    pub fn create(
        engine: Box<dyn AudioEngine>,
        resolver: Arc<dyn TrackResolver>,
        options: SessionOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(options.event_buffer.max(1));
        let snapshot = Arc::new(RwLock::new(SessionUpdate::default()));

        let actor = SessionActor {
            engine,
            engine_loaded: false,
            resolver,
            tx: tx.clone(),
            updates: updates.clone(),
            snapshot: Arc::clone(&snapshot),
            state: PlaybackState::Idle,
            current: None,
            duration_ms: None,
            generation: 0,
            pending_seek: None,
            resolving: None,
            queue: PlayQueue::new(),
            clock: ProgressClock::new(options.progress_interval),
        };
        let task = tokio::spawn(actor.run(rx));

        Self {
            tx,
            updates,
            snapshot,
            task: Some(task),
        }
    }

    /// Resolve and play `track`, superseding whatever was loading or playing.
    pub fn play(&self, track: Track) -> Result<(), SessionError> {
        self.send(SessionCommand::Play(track))
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Resume)
    }

    pub fn toggle_play_pause(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::TogglePlayPause)
    }

    /// Seek to an absolute position. Ignored unless a track is loaded or loading.
    pub fn seek_to(&self, position_ms: u64) -> Result<(), SessionError> {
        self.send(SessionCommand::SeekTo(position_ms))
    }

    pub fn skip_next(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::SkipNext)
    }

    pub fn skip_prev(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::SkipPrev)
    }

    /// Replace the list used for skipping and auto-advance.
    pub fn set_tracks(&self, tracks: Vec<Track>) -> Result<(), SessionError> {
        self.send(SessionCommand::SetTracks(tracks))
    }

    /// Subscribe to transitions and progress samples.
    pub fn observe_state(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// The most recently published update.
    pub fn snapshot(&self) -> SessionUpdate {
        self.snapshot.read().clone()
    }

    /// Stop playback, release the engine and wait for the task to finish.
    pub async fn release(mut self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Message::Shutdown(Some(ack_tx))).is_ok() {
            let _ = ack_rx.await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(Message::Command(command))
            .map_err(|_| SessionError::Closed)
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.send(Message::Shutdown(None));
        }
    }
}

struct SessionActor {
    engine: Box<dyn AudioEngine>,
    /// The engine was handed media since the last stop
    engine_loaded: bool,
    resolver: Arc<dyn TrackResolver>,
    tx: mpsc::UnboundedSender<Message>,
    updates: broadcast::Sender<SessionUpdate>,
    snapshot: Arc<RwLock<SessionUpdate>>,
    state: PlaybackState,
    current: Option<Track>,
    duration_ms: Option<u64>,
    generation: u64,
    /// Seek requested while loading, applied once ready
    pending_seek: Option<u64>,
    resolving: Option<JoinHandle<()>>,
    queue: PlayQueue,
    clock: ProgressClock,
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        tracing::debug!("Playback session started");
        while let Some(message) = rx.recv().await {
            match message {
                Message::Command(command) => self.on_command(command),
                Message::Resolved { generation, result } => self.on_resolved(generation, result),
                Message::Engine { generation, event } => self.on_engine_event(generation, event),
                Message::Tick { generation } => self.on_tick(generation),
                Message::Shutdown(ack) => {
                    self.shutdown();
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                    break;
                }
            }
        }
        tracing::debug!("Playback session finished");
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Play(track) => self.play(track),
            SessionCommand::Pause => self.pause(),
            SessionCommand::Resume => self.resume(),
            SessionCommand::TogglePlayPause => match self.state {
                PlaybackState::Playing => self.pause(),
                PlaybackState::Paused => self.resume(),
                _ => {}
            },
            SessionCommand::SeekTo(position_ms) => self.seek(position_ms),
            SessionCommand::SkipNext => {
                if let Some(next) = self.queue.peek_next().cloned() {
                    self.play(next);
                } else {
                    tracing::debug!(
                        empty_list = self.queue.is_empty(),
                        "Skip next ignored: no next track"
                    );
                }
            }
            SessionCommand::SkipPrev => {
                if let Some(previous) = self.queue.peek_previous().cloned() {
                    self.play(previous);
                } else {
                    tracing::debug!(
                        empty_list = self.queue.is_empty(),
                        "Skip previous ignored: no previous track"
                    );
                }
            }
            SessionCommand::SetTracks(tracks) => {
                self.queue.replace(tracks, self.current.as_ref());
                tracing::debug!(
                    tracks = self.queue.len(),
                    position = ?self.queue.current_index(),
                    "Active list replaced"
                );
            }
        }
    }

    fn play(&mut self, track: Track) {
        self.cancel_load();
        self.generation += 1;
        let generation = self.generation;

        tracing::info!(
            generation,
            backend = %track.backend,
            id = %track.id,
            title = %track.title,
            "Loading track"
        );

        self.queue.select(&track);
        self.current = Some(track.clone());
        self.duration_ms = None;
        self.transition(PlaybackState::Loading);

        let resolver = Arc::clone(&self.resolver);
        let tx = self.tx.clone();
        self.resolving = Some(tokio::spawn(async move {
            let result = resolver.resolve_track(&track).await;
            let _ = tx.send(Message::Resolved { generation, result });
        }));
    }

    fn on_resolved(&mut self, generation: u64, result: Result<Track, StreamError>) {
        if generation != self.generation || self.state != PlaybackState::Loading {
            tracing::debug!(generation, current = self.generation, "Discarding stale resolution");
            return;
        }
        self.resolving = None;

        let track = match result {
            Ok(track) if track.is_playable() => track,
            Ok(_) => return self.fail(StreamError::NoStreamAvailable.into()),
            Err(e) => return self.fail(e.into()),
        };
        let url = track.stream_url.clone().unwrap_or_default();
        self.current = Some(track);

        let listener = EngineListener::new(generation, self.tx.clone());
        self.engine_loaded = true;
        if let Err(e) = self.engine.load(&url, listener) {
            self.fail(e.into());
        }
    }

    fn on_engine_event(&mut self, generation: u64, event: EngineEvent) {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                ?event,
                "Discarding stale engine event"
            );
            return;
        }

        match event {
            EngineEvent::Ready { duration_ms } => {
                if self.state != PlaybackState::Loading {
                    return;
                }
                self.duration_ms = duration_ms;
                self.transition(PlaybackState::Ready);

                if let Some(position_ms) = self.pending_seek.take() {
                    if let Err(e) = self.engine.seek(position_ms) {
                        return self.fail(e.into());
                    }
                }
                self.start_output();
            }
            EngineEvent::Ended => {
                if self.state != PlaybackState::Playing {
                    return;
                }
                self.clock.stop();
                match self.queue.peek_next().cloned() {
                    Some(next) => self.play(next),
                    None => {
                        tracing::info!("Reached end of list");
                        self.stop_engine();
                        self.current = None;
                        self.duration_ms = None;
                        self.transition(PlaybackState::Idle);
                    }
                }
            }
            EngineEvent::Failed(e) => {
                if self.state == PlaybackState::Loading || self.state.has_loaded_track() {
                    self.fail(e.into());
                }
            }
        }
    }

    fn on_tick(&mut self, generation: u64) {
        if generation != self.generation || self.state != PlaybackState::Playing {
            return;
        }
        let sample = ProgressSample {
            position_ms: self.engine.position_ms(),
            duration_ms: self.duration_ms,
        };
        self.publish(Some(sample));
    }

    fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        match self.engine.pause() {
            Ok(()) => {
                self.clock.stop();
                self.transition(PlaybackState::Paused);
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.start_output();
    }

    fn seek(&mut self, position_ms: u64) {
        match self.state {
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused => {
                if let Err(e) = self.engine.seek(position_ms) {
                    self.fail(e.into());
                }
            }
            PlaybackState::Loading => self.pending_seek = Some(position_ms),
            _ => tracing::debug!(position_ms, state = %self.state, "Seek ignored"),
        }
    }

    /// Ready or Paused → Playing.
    fn start_output(&mut self) {
        if let Err(e) = self.engine.start() {
            return self.fail(e.into());
        }
        self.transition(PlaybackState::Playing);
        self.clock.start(&self.state, self.generation, &self.tx);
    }

    fn fail(&mut self, reason: PlaybackFailure) {
        tracing::warn!(error = %reason, "Playback failed");
        self.cancel_load();
        self.transition(PlaybackState::Error(reason));
    }

    /// Tear down the in-flight resolution, the clock and any loaded media.
    fn cancel_load(&mut self) {
        self.clock.stop();
        if let Some(task) = self.resolving.take() {
            task.abort();
        }
        self.pending_seek = None;
        self.stop_engine();
    }

    fn stop_engine(&mut self) {
        if self.engine_loaded {
            self.engine.stop();
            self.engine_loaded = false;
        }
    }

    fn shutdown(&mut self) {
        self.cancel_load();
        self.engine.release();
        tracing::debug!("Audio engine released");
    }

    fn transition(&mut self, state: PlaybackState) {
        tracing::debug!(from = %self.state, to = %state, "Session transition");
        self.state = state;
        self.publish(None);
    }

    fn publish(&self, progress: Option<ProgressSample>) {
        let update = SessionUpdate {
            state: self.state.clone(),
            track: self.current.clone(),
            duration_ms: self.duration_ms,
            progress,
        };
        *self.snapshot.write() = update.clone();
        // No observers is fine
        let _ = self.updates.send(update);
    }
}
