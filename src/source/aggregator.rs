//! Search across candidate backends with ordered fallback.
//!
//! Backends are tried strictly one after another, never fanned out: the
//! first one yielding at least one track wins and the rest are not
//! contacted. Each attempt produces a typed outcome, so classification
//! (network / malformed / empty) is structural.
//!
//! Starting a new search aborts the previous one. A search that was
//! superseded returns [`SearchError::Cancelled`] even if its network work
//! happened to finish, so stale results can never reach the caller.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::AbortHandle;

use super::client::fetch_with_timeout;
use super::domain::{BackendFailure, FailureKind, SearchError};
use super::normalize::normalize;
use super::traits::HttpFetch;
use crate::backends::{BackendEndpoint, CandidateBackends, ContainerHint};
use crate::model::{SearchResult, Track};

/// Generation counter and the task of the newest search.
///
/// Both live under one lock so that bumping the generation and replacing
/// the in-flight task happen as one step.
#[derive(Default)]
struct SearchSlot {
    generation: u64,
    in_flight: Option<AbortHandle>,
}

/// Drives [`CandidateBackends`] in priority order.
pub struct SearchAggregator {
    backends: Arc<CandidateBackends>,
    fetcher: Arc<dyn HttpFetch>,
    slot: Mutex<SearchSlot>,
}

impl SearchAggregator {
    pub fn new(backends: Arc<CandidateBackends>, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            backends,
            fetcher,
            slot: Mutex::new(SearchSlot::default()),
        }
    }

    pub fn backends(&self) -> &CandidateBackends {
        &self.backends
    }

    /// Search every backend in order until one yields tracks.
    ///
    /// Rejects an empty query without any network I/O.
    pub async fn search(&self, query: &str) -> Result<SearchResult, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let (generation, handle) = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            if let Some(prev) = slot.in_flight.take() {
                tracing::debug!(superseded = slot.generation - 1, "Cancelling previous search");
                prev.abort();
            }

            let backends = Arc::clone(&self.backends);
            let fetcher = Arc::clone(&self.fetcher);
            let owned_query = query.to_string();
            let handle = tokio::spawn(async move {
                run_fallback(&backends, fetcher.as_ref(), &owned_query).await
            });
            slot.in_flight = Some(handle.abort_handle());
            (slot.generation, handle)
        };

        let outcome = handle.await;

        {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                return Err(SearchError::Cancelled);
            }
            slot.in_flight = None;
        }

        match outcome {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(SearchError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }

    /// List the tracks of `parent`'s album on the backend that produced it.
    ///
    /// Entries missing artist, cover or album id inherit them from `parent`.
    pub async fn album_tracks(&self, parent: &Track) -> Result<Vec<Track>, SearchError> {
        let endpoint = self.backends.get(&parent.backend).ok_or_else(|| {
            SearchError::AlbumUnavailable(format!("unknown backend {}", parent.backend))
        })?;
        let album_id = parent
            .album_id
            .as_deref()
            .ok_or_else(|| SearchError::AlbumUnavailable("track has no album id".to_string()))?;
        let url = endpoint.album_url(album_id).ok_or_else(|| {
            SearchError::AlbumUnavailable(format!("{} has no album listing", endpoint.id))
        })?;

        let mut tracks = fetch_tracks(endpoint, self.fetcher.as_ref(), &url, ContainerHint::Data)
            .await
            .map_err(|failure| SearchError::Exhausted(vec![failure]))?;

        for track in &mut tracks {
            track.inherit_from(parent);
        }
        tracing::info!(album = album_id, count = tracks.len(), "Loaded album tracks");
        Ok(tracks)
    }
}

async fn run_fallback(
    backends: &CandidateBackends,
    fetcher: &dyn HttpFetch,
    query: &str,
) -> Result<SearchResult, SearchError> {
    let mut failures = Vec::with_capacity(backends.len());

    for endpoint in backends.ordered() {
        let url = endpoint.search_url(query);
        match fetch_tracks(endpoint, fetcher, &url, endpoint.container).await {
            Ok(tracks) => {
                tracing::info!(
                    query,
                    backend = %endpoint.id,
                    count = tracks.len(),
                    skipped = failures.len(),
                    "Search succeeded"
                );
                return Ok(SearchResult {
                    query: query.to_string(),
                    tracks,
                    origin_backend: endpoint.id.clone(),
                    failures,
                });
            }
            Err(failure) => {
                tracing::warn!("Backend failed, trying next: {}", failure);
                failures.push(failure);
            }
        }
    }

    tracing::warn!(query, "All backends failed");
    Err(SearchError::Exhausted(failures))
}

/// One attempt against one backend, classified.
async fn fetch_tracks(
    endpoint: &BackendEndpoint,
    fetcher: &dyn HttpFetch,
    url: &str,
    hint: ContainerHint,
) -> Result<Vec<Track>, BackendFailure> {
    tracing::debug!(backend = %endpoint.id, url, "Requesting");

    let response = fetch_with_timeout(fetcher, url, endpoint.per_call_timeout())
        .await
        .map_err(|e| BackendFailure::new(&endpoint.id, FailureKind::Network, e.to_string()))?;

    if !response.is_success() {
        return Err(BackendFailure::new(
            &endpoint.id,
            FailureKind::Network,
            format!("HTTP {}", response.status),
        ));
    }

    let normalized = normalize(&response.body, hint, &endpoint.id).map_err(|e| {
        BackendFailure::new(&endpoint.id, FailureKind::MalformedResponse, e.to_string())
    })?;

    if normalized.tracks.is_empty() {
        return Err(BackendFailure::new(
            &endpoint.id,
            FailureKind::NoResults,
            format!("0 tracks ({} dropped)", normalized.dropped),
        ));
    }

    Ok(normalized.tracks)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::source::client::FetchError;
    use crate::test_utils::{MEGADETH_SAAVN_BODY, MockFetcher, endpoint, tracks_body};

    fn aggregator(endpoints: Vec<BackendEndpoint>, fetcher: Arc<MockFetcher>) -> SearchAggregator {
        SearchAggregator::new(Arc::new(CandidateBackends::new(endpoints)), fetcher)
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_io() {
        let fetcher = Arc::new(MockFetcher::new());
        let agg = aggregator(vec![endpoint("a", 1, ContainerHint::Data)], fetcher.clone());

        assert_eq!(agg.search("   ").await.unwrap_err(), SearchError::EmptyQuery);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_megadeth_scenario() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .respond("https://one.example/", "<html><body>Maintenance</body></html>")
                .respond("https://two.example/", MEGADETH_SAAVN_BODY),
        );
        let agg = aggregator(
            vec![
                endpoint("one", 1, ContainerHint::Data),
                endpoint("two", 2, ContainerHint::DataResults),
            ],
            fetcher,
        );

        let result = agg.search("Megadeth").await.unwrap();
        assert_eq!(result.origin_backend, "two");
        assert_eq!(result.tracks.len(), 1);
        let t = &result.tracks[0];
        assert_eq!(t.id, "1");
        assert_eq!(t.title, "Symphony of Destruction");
        assert_eq!(t.artist_name, "Megadeth");
        assert_eq!(t.cover_url.as_deref(), Some("hi.jpg"));
        assert_eq!(t.backend, "two");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].backend, "one");
        assert_eq!(result.failures[0].kind, FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_first_success_wins_and_stops() {
        // For every N and every winning position k, later backends are never contacted.
        for n in 1..=4u32 {
            for k in 1..=n {
                let mut fetcher = MockFetcher::new();
                let mut endpoints = Vec::new();
                for i in 1..=n {
                    let id = format!("b{}", i);
                    let prefix = format!("https://{}.example/", id);
                    fetcher = if i < k {
                        fetcher.respond(&prefix, r#"{"data": []}"#)
                    } else {
                        fetcher.respond(&prefix, &tracks_body(&id, 2))
                    };
                    endpoints.push(endpoint(&id, i, ContainerHint::Data));
                }
                let fetcher = Arc::new(fetcher);
                let agg = aggregator(endpoints, fetcher.clone());

                let result = agg.search("q").await.unwrap();
                assert_eq!(result.origin_backend, format!("b{}", k));
                assert_eq!(result.tracks[0].title, format!("b{} track 0", k));
                assert_eq!(fetcher.call_count(), k as usize);
            }
        }
    }

    #[tokio::test]
    async fn test_exhaustion_lists_every_backend_in_order() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .respond("https://html.example/", "<!DOCTYPE html><html></html>")
                .respond("https://empty.example/", r#"{"data": []}"#)
                .status("https://down.example/", 503, "Service Unavailable")
                .fail(
                    "https://refused.example/",
                    FetchError::Transport("connection refused".into()),
                ),
        );
        let agg = aggregator(
            vec![
                endpoint("refused", 4, ContainerHint::Data),
                endpoint("html", 1, ContainerHint::Data),
                endpoint("down", 3, ContainerHint::Data),
                endpoint("empty", 2, ContainerHint::Data),
            ],
            fetcher,
        );

        let err = agg.search("Megadeth").await.unwrap_err();
        let failures = err.failures();
        let summary: Vec<_> = failures.iter().map(|f| (f.backend.as_str(), f.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("html", FailureKind::MalformedResponse),
                ("empty", FailureKind::NoResults),
                ("down", FailureKind::Network),
                ("refused", FailureKind::Network),
            ]
        );
        assert!(failures[2].detail.contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_advances_to_next_backend() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .hang("https://slow.example/")
                .respond("https://fast.example/", &tracks_body("fast", 1)),
        );
        let mut slow = endpoint("slow", 1, ContainerHint::Data);
        slow.timeout_ms = 250;
        let agg = aggregator(vec![slow, endpoint("fast", 2, ContainerHint::Data)], fetcher);

        let result = agg.search("q").await.unwrap();
        assert_eq!(result.origin_backend, "fast");
        assert_eq!(result.failures[0].kind, FailureKind::Network);
        assert!(result.failures[0].detail.contains("timed out"));
    }

    #[tokio::test]
    async fn test_new_search_cancels_previous() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .hang("https://a.example/search?q=old")
                .respond("https://a.example/search?q=new", &tracks_body("a", 1)),
        );
        let agg = Arc::new(aggregator(
            vec![endpoint("a", 1, ContainerHint::Data)],
            fetcher.clone(),
        ));

        let stale = {
            let agg = Arc::clone(&agg);
            tokio::spawn(async move { agg.search("old").await })
        };
        while fetcher.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let fresh = agg.search("new").await.unwrap();
        assert_eq!(fresh.query, "new");

        let stale = tokio::time::timeout(Duration::from_secs(5), stale)
            .await
            .expect("stale search should finish once cancelled")
            .unwrap();
        assert_eq!(stale.unwrap_err(), SearchError::Cancelled);
    }

    #[tokio::test]
    async fn test_slow_stale_result_is_discarded() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .delay(
                    "https://a.example/search?q=old",
                    Duration::from_millis(50),
                    &tracks_body("a", 3),
                )
                .respond("https://a.example/search?q=new", &tracks_body("a", 1)),
        );
        let agg = Arc::new(aggregator(
            vec![endpoint("a", 1, ContainerHint::Data)],
            fetcher.clone(),
        ));

        let stale = {
            let agg = Arc::clone(&agg);
            tokio::spawn(async move { agg.search("old").await })
        };
        while fetcher.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let fresh = agg.search("new").await.unwrap();

        assert_eq!(fresh.tracks.len(), 1);
        assert_eq!(stale.await.unwrap().unwrap_err(), SearchError::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_searches_keep_the_newest() {
        let fetcher =
            Arc::new(MockFetcher::new().respond("https://a.example/", &tracks_body("a", 1)));
        let agg = Arc::new(aggregator(vec![endpoint("a", 1, ContainerHint::Data)], fetcher));

        for round in 0..200 {
            let barrier = Arc::new(tokio::sync::Barrier::new(2));
            let searches: Vec<_> = ["left", "right"]
                .into_iter()
                .map(|query| {
                    let agg = Arc::clone(&agg);
                    let barrier = Arc::clone(&barrier);
                    tokio::spawn(async move {
                        barrier.wait().await;
                        agg.search(query).await
                    })
                })
                .collect();

            let mut cancelled = 0;
            for search in searches {
                match search.await.unwrap() {
                    Ok(result) => assert_eq!(result.origin_backend, "a"),
                    Err(e) => {
                        assert_eq!(e, SearchError::Cancelled);
                        cancelled += 1;
                    }
                }
            }
            assert!(cancelled < 2, "round {}: both searches were cancelled", round);
        }
    }

    #[tokio::test]
    async fn test_album_tracks_inherit_from_parent() {
        let mut album_endpoint = endpoint("deezer", 1, ContainerHint::Data);
        album_endpoint.album_path_template = Some("/album/{id}/tracks".to_string());
        let fetcher = Arc::new(MockFetcher::new().respond(
            "https://deezer.example/album/42/tracks",
            r#"{"data": [
                {"id": 10, "title": "Holy Wars", "preview": "hw.mp3"},
                {"id": 11, "title": "Hangar 18", "preview": "h18.mp3",
                 "artist": {"name": "Megadeth"}}
            ]}"#,
        ));
        let agg = aggregator(vec![album_endpoint], fetcher);

        let mut parent = Track::new("deezer", "1", "Tornado of Souls");
        parent.artist_name = "Megadeth".to_string();
        parent.album_id = Some("42".to_string());
        parent.cover_url = Some("rip.jpg".to_string());

        let tracks = agg.album_tracks(&parent).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| t.artist_name == "Megadeth"));
        assert!(tracks.iter().all(|t| t.cover_url.as_deref() == Some("rip.jpg")));
        assert!(tracks.iter().all(|t| t.is_playable()));
    }

    #[tokio::test]
    async fn test_album_tracks_unavailable() {
        let fetcher = Arc::new(MockFetcher::new());
        let agg = aggregator(vec![endpoint("deezer", 1, ContainerHint::Data)], fetcher.clone());

        let no_album = Track::new("deezer", "1", "Single");
        assert!(matches!(
            agg.album_tracks(&no_album).await,
            Err(SearchError::AlbumUnavailable(_))
        ));

        let mut no_template = Track::new("deezer", "1", "Song");
        no_template.album_id = Some("42".to_string());
        assert!(matches!(
            agg.album_tracks(&no_template).await,
            Err(SearchError::AlbumUnavailable(_))
        ));

        let unknown = Track::new("elsewhere", "1", "Song");
        assert!(matches!(
            agg.album_tracks(&unknown).await,
            Err(SearchError::AlbumUnavailable(_))
        ));
        assert_eq!(fetcher.call_count(), 0);
    }
}
