//! Canonical data model shared by search, resolution and playback.
//!
//! Every backend response is normalized into [`Track`] before anything
//! else in the crate sees it. A [`SearchResult`] is the unit the UI layer
//! holds on to; it is replaced wholesale by the next search.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::source::BackendFailure;

/// Artist name used when no known alias is present in a record.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// A track as returned by one backend.
///
/// Two tracks are equal when they share both `id` and originating
/// `backend`; the same title on two mirrors is not assumed to be the
/// same resource. Records kept without an id are told apart by title and
/// artist instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Backend-scoped identifier
    pub id: String,
    /// Id of the backend that produced this track
    pub backend: String,
    pub title: String,
    pub artist_name: String,
    pub album_id: Option<String>,
    /// Best available cover resolution
    pub cover_url: Option<String>,
    pub duration_ms: Option<u64>,
    /// Playable audio URL, absent until resolved
    pub stream_url: Option<String>,
}

impl Track {
    /// Create a track with only identity fields set.
    pub fn new(
        backend: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            backend: backend.into(),
            title: title.into(),
            artist_name: UNKNOWN_ARTIST.to_string(),
            album_id: None,
            cover_url: None,
            duration_ms: None,
            stream_url: None,
        }
    }

    /// A track may be handed to the audio engine only once it has a URL.
    pub fn is_playable(&self) -> bool {
        self.stream_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Copy of this track with the stream URL set.
    pub fn with_stream_url(&self, url: impl Into<String>) -> Self {
        Self {
            stream_url: Some(url.into()),
            ..self.clone()
        }
    }

    /// Key used for caching and identity comparisons.
    pub fn key(&self) -> TrackKey {
        let (backend, id, title, artist) = self.identity();
        TrackKey {
            backend: backend.to_string(),
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
        }
    }

    /// `(backend, id, title, artist)`; title and artist only count when
    /// the backend gave no id.
    fn identity(&self) -> (&str, &str, &str, &str) {
        if self.id.is_empty() {
            (self.backend.as_str(), "", self.title.as_str(), self.artist_name.as_str())
        } else {
            (self.backend.as_str(), self.id.as_str(), "", "")
        }
    }

    /// Fill empty fields from a parent track (used for album listings,
    /// whose entries usually omit artist and artwork).
    pub fn inherit_from(&mut self, parent: &Track) {
        if self.artist_name.is_empty() || self.artist_name == UNKNOWN_ARTIST {
            self.artist_name = parent.artist_name.clone();
        }
        if self.cover_url.is_none() {
            self.cover_url = parent.cover_url.clone();
        }
        if self.album_id.is_none() {
            self.album_id = parent.album_id.clone();
        }
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Identity of a track: (backend, id), or (backend, title, artist) when
/// the id is missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub backend: String,
    pub id: String,
    pub title: String,
    pub artist: String,
}

/// Outcome of a successful search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The query as issued
    pub query: String,
    pub tracks: Vec<Track>,
    /// Backend that produced `tracks`
    pub origin_backend: String,
    /// Backends that failed before the winner, in the order tried
    pub failures: Vec<BackendFailure>,
}
