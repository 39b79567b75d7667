//! Periodic progress sampling.
//!
//! The clock does not read the engine itself: it posts a tick into the
//! session task, which samples the engine and publishes on the same
//! context as every other update. Ticks carry the load generation they
//! were started for, so a tick outliving its track is discarded.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::session::Message;
use super::state::PlaybackState;

/// Default sampling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

pub struct ProgressClock {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl ProgressClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Start ticking for `generation`. No effect unless `state` is
    /// `Playing` or when already running.
    pub(crate) fn start(
        &mut self,
        state: &PlaybackState,
        generation: u64,
        tx: &UnboundedSender<Message>,
    ) {
        if *state != PlaybackState::Playing || self.is_running() {
            return;
        }

        let tx = tx.clone();
        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(Message::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(generation, "Progress clock started");
    }

    /// Cancel the pending tick.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Progress clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Default for ProgressClock {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl Drop for ProgressClock {
    fn drop(&mut self) {
        self.stop();
    }
}
