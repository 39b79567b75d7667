//! The `Tidepool` facade: search, resolution and one playback session.
//!
//! This is the surface a UI layer consumes. Every screen shares the same
//! instance, so there is exactly one session and one engine per process.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::backends::CandidateBackends;
use crate::config::Config;
use crate::error::{Result, ResultExt};
use crate::model::{SearchResult, Track};
use crate::player::{AudioEngine, PlaybackSession, SessionError, SessionOptions, SessionUpdate};
use crate::source::{
    HttpClient, HttpFetch, SearchAggregator, SearchError, StreamError, StreamResolver,
};

/// Search, resolve and play through a single shared session.
pub struct Tidepool {
    search: SearchAggregator,
    resolver: Arc<StreamResolver>,
    session: PlaybackSession,
    /// List the user is browsing; becomes the skip list on `play`
    browsing: RwLock<Vec<Track>>,
    last_result: RwLock<Option<SearchResult>>,
}

impl Tidepool {
    /// Build from configuration with the production HTTP client.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(config: &Config, engine: Box<dyn AudioEngine>) -> Result<Self> {
        let client = HttpClient::with_user_agent(&config.http.user_agent)
            .with_context("Failed to build HTTP client")?;
        let fetcher: Arc<dyn HttpFetch> = Arc::new(client);
        Ok(Self::with_fetcher(
            CandidateBackends::from_config(config),
            fetcher,
            engine,
            config.playback.session_options(),
        ))
    }

    /// Build around an arbitrary transport.
    pub fn with_fetcher(
        backends: CandidateBackends,
        fetcher: Arc<dyn HttpFetch>,
        engine: Box<dyn AudioEngine>,
        options: SessionOptions,
    ) -> Self {
        let backends = Arc::new(backends);
        let search = SearchAggregator::new(Arc::clone(&backends), Arc::clone(&fetcher));
        let resolver = Arc::new(StreamResolver::new(backends, fetcher));
        let session = PlaybackSession::create(engine, resolver.clone(), options);

        Self {
            search,
            resolver,
            session,
            browsing: RwLock::new(Vec::new()),
            last_result: RwLock::new(None),
        }
    }

    /// Search every backend in priority order.
    ///
    /// A successful search becomes the current result set and drops every
    /// cached stream URL. A search superseded by a newer one returns
    /// [`SearchError::Cancelled`] and changes nothing.
    pub async fn search(&self, query: &str) -> std::result::Result<SearchResult, SearchError> {
        let result = self.search.search(query).await?;

        self.resolver.invalidate();
        *self.browsing.write() = result.tracks.clone();
        *self.last_result.write() = Some(result.clone());
        Ok(result)
    }

    /// Tracks of the album `track` belongs to; they become the browsing list.
    pub async fn album_tracks(
        &self,
        track: &Track,
    ) -> std::result::Result<Vec<Track>, SearchError> {
        let tracks = self.search.album_tracks(track).await?;
        *self.browsing.write() = tracks.clone();
        Ok(tracks)
    }

    /// Resolve a playable URL without playing.
    pub async fn resolve(&self, track: &Track) -> std::result::Result<Track, StreamError> {
        self.resolver.resolve_by_origin(track).await
    }

    /// Play `track`. When it belongs to the browsing list, that list
    /// drives skip and auto-advance.
    pub fn play(&self, track: Track) -> std::result::Result<(), SessionError> {
        {
            let browsing = self.browsing.read();
            if browsing.contains(&track) {
                self.session.set_tracks(browsing.clone())?;
            }
        }
        self.session.play(track)
    }

    pub fn pause(&self) -> std::result::Result<(), SessionError> {
        self.session.pause()
    }

    pub fn resume(&self) -> std::result::Result<(), SessionError> {
        self.session.resume()
    }

    pub fn toggle_play_pause(&self) -> std::result::Result<(), SessionError> {
        self.session.toggle_play_pause()
    }

    pub fn seek_to(&self, position_ms: u64) -> std::result::Result<(), SessionError> {
        self.session.seek_to(position_ms)
    }

    pub fn skip_next(&self) -> std::result::Result<(), SessionError> {
        self.session.skip_next()
    }

    pub fn skip_prev(&self) -> std::result::Result<(), SessionError> {
        self.session.skip_prev()
    }

    /// Subscribe to session transitions and progress.
    pub fn observe_state(&self) -> broadcast::Receiver<SessionUpdate> {
        self.session.observe_state()
    }

    pub fn snapshot(&self) -> SessionUpdate {
        self.session.snapshot()
    }

    /// The most recent successful search.
    pub fn last_result(&self) -> Option<SearchResult> {
        self.last_result.read().clone()
    }

    pub fn backends(&self) -> &CandidateBackends {
        self.search.backends()
    }

    /// Stop playback and release the engine.
    pub async fn release(self) {
        self.session.release().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{ContainerHint, StreamEndpoint};
    use crate::player::{PlaybackFailure, PlaybackState};
    use crate::test_utils::{
        EngineCall, MockEngine, MockFetcher, endpoint, next_update, tracks_body, wait_for_state,
    };

    const PIPED_SEARCH: &str = r#"{"items": [
        {"url": "/watch?v=abc", "title": "Hangar 18", "uploaderName": "Megadeth"},
        {"url": "/watch?v=def", "title": "Tornado of Souls", "uploaderName": "Megadeth"}
    ]}"#;
    const PIPED_STREAMS: &str =
        r#"{"audioStreams": [{"url": "https://cdn.example/lo"}, {"url": "https://cdn.example/hi"}]}"#;

    fn piped_backends() -> CandidateBackends {
        let mut piped = endpoint("piped", 1, ContainerHint::Items);
        piped.stream = Some(StreamEndpoint {
            path_template: "/streams/{id}".to_string(),
            array_key: Some("audioStreams".to_string()),
        });
        CandidateBackends::new(vec![piped])
    }

    fn app(backends: CandidateBackends, fetcher: MockFetcher, engine: MockEngine) -> Tidepool {
        Tidepool::with_fetcher(
            backends,
            Arc::new(fetcher),
            Box::new(engine),
            SessionOptions {
                progress_interval: std::time::Duration::from_secs(3600),
                event_buffer: 64,
            },
        )
    }

    #[tokio::test]
    async fn test_search_then_play_resolves_best_stream() {
        let fetcher = MockFetcher::new()
            .respond("https://piped.example/search", PIPED_SEARCH)
            .respond("https://piped.example/streams/", PIPED_STREAMS);
        let (engine, probe) = MockEngine::auto_ready(Some(297_000));
        let app = app(piped_backends(), fetcher, engine);
        let mut rx = app.observe_state();

        let result = app.search("megadeth").await.unwrap();
        assert_eq!(result.origin_backend, "piped");
        assert_eq!(result.tracks[0].id, "abc");
        assert!(!result.tracks[0].is_playable());

        app.play(result.tracks[0].clone()).unwrap();
        let playing = wait_for_state(&mut rx, PlaybackState::Playing).await;
        assert_eq!(
            playing.track.unwrap().stream_url.as_deref(),
            Some("https://cdn.example/hi")
        );
        assert_eq!(probe.loads(), vec!["https://cdn.example/hi".to_string()]);
        assert_eq!(app.resolver.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_new_search_invalidates_stream_cache() {
        let fetcher = MockFetcher::new()
            .respond("https://piped.example/search", PIPED_SEARCH)
            .respond("https://piped.example/streams/", PIPED_STREAMS);
        let (engine, _probe) = MockEngine::auto_ready(None);
        let app = app(piped_backends(), fetcher, engine);

        let result = app.search("megadeth").await.unwrap();
        app.resolve(&result.tracks[1]).await.unwrap();
        assert_eq!(app.resolver.cached_len(), 1);

        app.search("megadeth live").await.unwrap();
        assert_eq!(app.resolver.cached_len(), 0);
        assert_eq!(app.last_result().unwrap().query, "megadeth live");
    }

    #[tokio::test]
    async fn test_failed_search_keeps_previous_result() {
        let fetcher = MockFetcher::new()
            .respond("https://deezer.example/search?q=first", &tracks_body("d", 2))
            .status("https://deezer.example/search", 503, "");
        let (engine, _probe) = MockEngine::auto_ready(None);
        let app = app(
            CandidateBackends::new(vec![endpoint("deezer", 1, ContainerHint::Data)]),
            fetcher,
            engine,
        );

        app.search("first").await.unwrap();
        let err = app.search("second").await.unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(app.last_result().unwrap().query, "first");
    }

    #[tokio::test]
    async fn test_play_from_results_enables_skip() {
        let fetcher =
            MockFetcher::new().respond("https://deezer.example/search", &tracks_body("d", 3));
        let (engine, probe) = MockEngine::auto_ready(None);
        let app = app(
            CandidateBackends::new(vec![endpoint("deezer", 1, ContainerHint::Data)]),
            fetcher,
            engine,
        );
        let mut rx = app.observe_state();

        let result = app.search("anything").await.unwrap();
        app.play(result.tracks[1].clone()).unwrap();
        wait_for_state(&mut rx, PlaybackState::Playing).await;

        app.skip_next().unwrap();
        let playing = wait_for_state(&mut rx, PlaybackState::Playing).await;
        assert_eq!(playing.track.unwrap().id, "d-2");

        app.skip_prev().unwrap();
        let playing = wait_for_state(&mut rx, PlaybackState::Playing).await;
        assert_eq!(playing.track.unwrap().id, "d-1");

        assert_eq!(probe.loads().len(), 3);
        app.release().await;
        assert_eq!(probe.calls().last(), Some(&EngineCall::Release));
    }

    #[tokio::test]
    async fn test_empty_stream_candidates_end_in_error() {
        let fetcher = MockFetcher::new()
            .respond("https://piped.example/search", PIPED_SEARCH)
            .respond("https://piped.example/streams/", r#"{"audioStreams": []}"#);
        let (engine, probe) = MockEngine::auto_ready(None);
        let app = app(piped_backends(), fetcher, engine);
        let mut rx = app.observe_state();

        let result = app.search("megadeth").await.unwrap();
        assert_eq!(app.snapshot().state, PlaybackState::Idle);
        app.play(result.tracks[0].clone()).unwrap();

        let loading = next_update(&mut rx).await;
        assert_eq!(loading.state, PlaybackState::Loading);
        let failed = next_update(&mut rx).await;
        assert_eq!(
            failed.state,
            PlaybackState::Error(PlaybackFailure::Stream(StreamError::NoStreamAvailable))
        );
        assert_eq!(failed.track.unwrap().id, "abc");

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        assert!(probe.loads().is_empty());
        assert_eq!(app.resolver.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_new_from_config() {
        let mut config = Config::default();
        config.backends.truncate(1);
        let (engine, probe) = MockEngine::new();

        let app = Tidepool::new(&config, Box::new(engine)).unwrap();
        assert_eq!(app.backends().len(), 1);
        assert_eq!(app.backends().ordered()[0], config.backends[0]);
        assert_eq!(app.snapshot().state, PlaybackState::Idle);
        assert!(app.last_result().is_none());

        app.release().await;
        assert_eq!(probe.calls(), vec![EngineCall::Release]);
    }
}
