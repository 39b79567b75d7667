//! Source resolution: finding tracks on unreliable mirrors and making them playable.
//!
//! # Architecture
//!
//! - **Domain errors** (`domain.rs`) - failure taxonomy shared by search and resolution
//! - **Normalizer** (`normalize.rs`) - pure JSON → [`Track`](crate::model::Track) mapping
//! - **Client** (`client.rs`) - `reqwest` transport behind the [`HttpFetch`] seam
//! - **Aggregator** (`aggregator.rs`) - ordered fallback across backends
//! - **Resolver** (`resolver.rs`) - second-hop stream URL resolution with caching
//!
//! Nothing here knows about playback; the session only sees [`TrackResolver`].
//!
//! # Usage
//!
//! ```ignore
//! let backends = Arc::new(CandidateBackends::default());
//! let fetcher: Arc<dyn HttpFetch> = Arc::new(HttpClient::new()?);
//! let search = SearchAggregator::new(backends.clone(), fetcher.clone());
//! let resolver = StreamResolver::new(backends, fetcher);
//!
//! let result = search.search("Megadeth").await?;
//! let playable = resolver.resolve_by_origin(&result.tracks[0]).await?;
//! ```

pub mod aggregator;
pub mod client;
pub mod domain;
pub mod normalize;
pub mod resolver;
pub mod traits;

pub use aggregator::SearchAggregator;
pub use client::{FetchError, HttpClient, HttpResponse};
pub use domain::{BackendFailure, FailureKind, ParseError, SearchError, StreamError};
pub use normalize::{Normalized, normalize};
pub use resolver::StreamResolver;
pub use traits::{HttpFetch, TrackResolver};
