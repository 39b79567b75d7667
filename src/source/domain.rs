//! Failure taxonomy for search and stream resolution.
//!
//! Per-backend failures ([`FailureKind`]) never reach the caller on their
//! own; they are recovered by advancing to the next candidate and only
//! surface inside [`SearchError::Exhausted`]. [`StreamError`] is kept
//! distinct so the UI can tell "nothing found" from "found but unplayable".

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why one backend did not produce results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Timeout, connection failure or non-success HTTP status
    Network,
    /// Body is not the expected JSON container (HTML error pages included)
    MalformedResponse,
    /// Valid response with zero usable tracks
    NoResults,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Network => "NetworkError",
            FailureKind::MalformedResponse => "MalformedResponseError",
            FailureKind::NoResults => "NoResultsError",
        };
        f.write_str(s)
    }
}

/// One recorded failure during a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendFailure {
    /// Backend id
    pub backend: String,
    pub kind: FailureKind,
    /// Human-readable detail for diagnostics
    pub detail: String,
}

impl BackendFailure {
    pub fn new(backend: impl Into<String>, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.backend, self.kind, self.detail)
    }
}

/// Errors surfaced by [`super::SearchAggregator`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("Search query must not be empty")]
    EmptyQuery,

    #[error("Search was superseded by a newer search")]
    Cancelled,

    #[error("All {} backends failed: {}", .0.len(), format_failures(.0))]
    Exhausted(Vec<BackendFailure>),

    #[error("Album listing unavailable: {0}")]
    AlbumUnavailable(String),
}

impl SearchError {
    /// Per-backend failures, empty unless the search was exhausted.
    pub fn failures(&self) -> &[BackendFailure] {
        match self {
            SearchError::Exhausted(failures) => failures,
            _ => &[],
        }
    }
}

fn format_failures(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by [`super::StreamResolver`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("No stream available for this track")]
    NoStreamAvailable,

    #[error("Network error while resolving stream: {0}")]
    Network(String),

    #[error("Malformed stream response: {0}")]
    Malformed(String),

    #[error("Backend {0} cannot resolve streams")]
    Unsupported(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),
}

/// Errors from [`super::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Response is an HTML page, not JSON")]
    Html,

    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}
