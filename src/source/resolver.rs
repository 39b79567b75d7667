//! Stream URL resolution.
//!
//! Tracks that came back from search with a direct URL are returned as-is.
//! Everything else takes a second hop to the originating backend, which
//! answers with a quality-ranked candidate array; the last candidate is
//! the best one.
//!
//! Resolved URLs are cached per `(backend, id)` for the lifetime of the
//! current result set. [`StreamResolver::invalidate`] drops the cache
//! wholesale when a new search supersedes it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::client::fetch_with_timeout;
use super::domain::StreamError;
use super::normalize::parse_body;
use super::traits::HttpFetch;
use crate::backends::{BackendEndpoint, CandidateBackends};
use crate::model::{Track, TrackKey};

/// Keys probed for the candidate array when the backend does not name one.
const CANDIDATE_KEYS: &[&str] = &["audioStreams", "streams", "data"];

#[derive(Default)]
struct StreamCache {
    /// Bumped on every invalidation
    epoch: u64,
    urls: HashMap<TrackKey, String>,
}

/// Resolves playable URLs, one second hop per track at most.
pub struct StreamResolver {
    backends: Arc<CandidateBackends>,
    fetcher: Arc<dyn HttpFetch>,
    cache: RwLock<StreamCache>,
}

impl StreamResolver {
    pub fn new(backends: Arc<CandidateBackends>, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            backends,
            fetcher,
            cache: RwLock::new(StreamCache::default()),
        }
    }

    /// Resolve `track` against the backend that produced it.
    pub async fn resolve(
        &self,
        track: &Track,
        hint: &BackendEndpoint,
    ) -> Result<Track, StreamError> {
        if track.is_playable() {
            return Ok(track.clone());
        }

        let key = track.key();
        let epoch = {
            let cache = self.cache.read();
            if let Some(url) = cache.urls.get(&key) {
                tracing::debug!(track = %track.id, "Stream URL served from cache");
                return Ok(track.with_stream_url(url.clone()));
            }
            cache.epoch
        };

        if track.id.is_empty() {
            return Err(StreamError::NoStreamAvailable);
        }

        let url = hint
            .stream_url(&track.id)
            .ok_or_else(|| StreamError::Unsupported(hint.id.clone()))?;

        tracing::debug!(backend = %hint.id, url, "Resolving stream");
        let response = fetch_with_timeout(self.fetcher.as_ref(), &url, hint.per_call_timeout())
            .await
            .map_err(|e| StreamError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(StreamError::Network(format!("HTTP {}", response.status)));
        }

        let array_key = hint.stream.as_ref().and_then(|s| s.array_key.as_deref());
        let stream = select_stream(&response.body, array_key)?;

        {
            let mut cache = self.cache.write();
            if cache.epoch == epoch {
                cache.urls.insert(key, stream.clone());
            } else {
                tracing::debug!(
                    track = %track.id,
                    "Result set changed during resolution, not caching"
                );
            }
        }

        tracing::info!(track = %track.id, backend = %hint.id, "Stream resolved");
        Ok(track.with_stream_url(stream))
    }

    /// Resolve using the track's own backend as the hint.
    pub async fn resolve_by_origin(&self, track: &Track) -> Result<Track, StreamError> {
        if track.is_playable() {
            return Ok(track.clone());
        }
        let hint = self
            .backends
            .get(&track.backend)
            .ok_or_else(|| StreamError::UnknownBackend(track.backend.clone()))?;
        self.resolve(track, hint).await
    }

    /// Forget every cached URL; in-flight resolutions will not repopulate.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        cache.epoch += 1;
        cache.urls.clear();
    }

    /// Number of cached URLs.
    pub fn cached_len(&self) -> usize {
        self.cache.read().urls.len()
    }
}

/// Pick the highest-quality candidate (the last one) from a stream response.
pub(crate) fn select_stream(body: &str, array_key: Option<&str>) -> Result<String, StreamError> {
    let root = parse_body(body).map_err(|e| StreamError::Malformed(e.to_string()))?;

    let candidates = match array_key {
        Some(key) => root.get(key).and_then(Value::as_array),
        None => root.as_array().or_else(|| {
            CANDIDATE_KEYS
                .iter()
                .find_map(|k| root.get(*k).and_then(Value::as_array))
        }),
    }
    .ok_or_else(|| StreamError::Malformed("no stream candidate array".to_string()))?;

    candidates
        .last()
        .and_then(candidate_url)
        .ok_or(StreamError::NoStreamAvailable)
}

fn candidate_url(candidate: &Value) -> Option<String> {
    let url = match candidate {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("link"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    let url = url.trim();
    (!url.is_empty()).then(|| url.to_string())
}
