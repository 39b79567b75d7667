//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the crate.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level error enum
//! - Module-specific errors (e.g., [`SearchError`], [`StreamError`]) for detailed handling
//! - All errors implement `std::error::Error` for compatibility
//!
//! # Example
//!
//! ```ignore
//! use tidepool::error::{Result, ResultExt};
//!
//! async fn first_playable(app: &Tidepool, query: &str) -> Result<Track> {
//!     let result = app.search(query).await?;       // SearchError auto-converts
//!     let track = app.resolve(&result.tracks[0]).await?; // StreamError too
//!     Ok(track)
//! }
//! ```

use crate::config::ConfigError;
use crate::player::SessionError;
use crate::source::{FetchError, SearchError, StreamError};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Search failed on every backend, or was superseded
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Stream URL could not be resolved
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// HTTP client could not be built or used
    #[error("HTTP error: {0}")]
    Fetch(#[from] FetchError),

    /// Playback session is gone
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// The error without any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Into::<Error>::into(e).context(ctx))
    }
}
