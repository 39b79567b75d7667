//! Active track list for skip and auto-advance.

use crate::model::Track;

/// The ordered list the session skips through, with current position tracking.
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    /// All tracks in list order
    items: Vec<Track>,
    /// Index of the current track, if it belongs to this list
    position: Option<usize>,
}

impl PlayQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get queue length.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Replace the list. The position is kept only if `current` is in the new list.
    pub fn replace(&mut self, items: Vec<Track>, current: Option<&Track>) {
        self.items = items;
        self.position = current.and_then(|t| self.index_of(t));
    }

    /// Get current position.
    pub fn current_index(&self) -> Option<usize> {
        self.position.filter(|&i| i < self.items.len())
    }

    /// Point the queue at `track`; returns its index, or clears the
    /// position when the track is not part of the list.
    pub fn select(&mut self, track: &Track) -> Option<usize> {
        self.position = self.index_of(track);
        self.position
    }

    /// Track after the current one, without moving. `None` at the end.
    pub fn peek_next(&self) -> Option<&Track> {
        let i = self.current_index()?;
        self.items.get(i + 1)
    }

    /// Track before the current one, without moving. `None` at the start.
    pub fn peek_previous(&self) -> Option<&Track> {
        let i = self.current_index()?;
        i.checked_sub(1).and_then(|p| self.items.get(p))
    }

    fn index_of(&self, track: &Track) -> Option<usize> {
        self.items.iter().position(|t| t == track)
    }
}
