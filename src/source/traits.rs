//! Trait seams for network access and stream resolution.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses [`super::HttpClient`] and [`super::StreamResolver`];
//! tests substitute the scripted implementations in [`mocks`].

use std::time::Duration;

use async_trait::async_trait;

use super::client::{FetchError, HttpResponse};
use super::domain::StreamError;
use crate::model::Track;

/// A single HTTP GET.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch `url`, giving up after `timeout`.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, FetchError>;
}

/// Turns a track into a playable one.
///
/// This is what the playback session depends on; it never sees backends
/// or HTTP.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Return a copy of `track` with a non-empty `stream_url`.
    async fn resolve_track(&self, track: &Track) -> Result<Track, StreamError>;
}

#[async_trait]
impl TrackResolver for super::resolver::StreamResolver {
    async fn resolve_track(&self, track: &Track) -> Result<Track, StreamError> {
        self.resolve_by_origin(track).await
    }
}
