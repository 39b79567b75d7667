//! Candidate backends: the ordered list of mirrors a search walks through.
//!
//! The list is built once at startup (from [`crate::config::Config`]) and
//! never mutated afterwards. Each entry carries the one piece of structural
//! knowledge the aggregator needs, the [`ContainerHint`]; everything finer
//! is absorbed by the normalizer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where a backend nests the result array in its search response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerHint {
    /// `{"items": [...]}`
    Items,
    /// `{"data": [...]}`
    #[default]
    Data,
    /// `{"data": {"results": [...]}}`
    DataResults,
    /// `[...]`
    RawArray,
}

impl ContainerHint {
    /// All known container locations, in probing order.
    pub const ALL: [ContainerHint; 4] = [
        ContainerHint::Items,
        ContainerHint::Data,
        ContainerHint::DataResults,
        ContainerHint::RawArray,
    ];
}

/// Second-hop endpoint returning a quality-ranked array of stream candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEndpoint {
    /// Path appended to the backend base URL; `{id}` is replaced by the track id
    pub path_template: String,
    /// Key holding the candidate array (`None` = raw array or a well-known key)
    #[serde(default)]
    pub array_key: Option<String>,
}

/// One search mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoint {
    /// Short stable name, recorded on every track this backend produces
    pub id: String,
    pub base_url: String,
    /// Path appended to `base_url`; `{query}` is replaced by the URL-encoded query
    pub search_path_template: String,
    /// Ordinal, 1 is tried first
    pub priority: u32,
    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub container: ContainerHint,
    /// Album track listing; `{id}` is replaced by the album id
    #[serde(default)]
    pub album_path_template: Option<String>,
    /// Second hop for tracks that carry no direct stream URL
    #[serde(default)]
    pub stream: Option<StreamEndpoint>,
}

fn default_timeout_ms() -> u64 {
    8_000
}

impl BackendEndpoint {
    /// Timeout applied to every request sent to this backend.
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Full search URL for a query.
    pub fn search_url(&self, query: &str) -> String {
        let path = self
            .search_path_template
            .replace("{query}", &urlencoding::encode(query));
        join_url(&self.base_url, &path)
    }

    /// Full stream-resolution URL for a track id, if this backend has a second hop.
    pub fn stream_url(&self, track_id: &str) -> Option<String> {
        self.stream.as_ref().map(|s| {
            let path = s.path_template.replace("{id}", &urlencoding::encode(track_id));
            join_url(&self.base_url, &path)
        })
    }

    /// Full album listing URL, if this backend supports album browsing.
    pub fn album_url(&self, album_id: &str) -> Option<String> {
        self.album_path_template.as_ref().map(|t| {
            let path = t.replace("{id}", &urlencoding::encode(album_id));
            join_url(&self.base_url, &path)
        })
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Mirrors shipped with the default configuration.
pub fn default_endpoints() -> Vec<BackendEndpoint> {
    vec![
        BackendEndpoint {
            id: "deezer".to_string(),
            base_url: "https://api.deezer.com".to_string(),
            search_path_template: "/search?q={query}".to_string(),
            priority: 1,
            timeout_ms: 8_000,
            container: ContainerHint::Data,
            stream: None,
            album_path_template: Some("/album/{id}/tracks".to_string()),
        },
        BackendEndpoint {
            id: "saavn".to_string(),
            base_url: "https://saavn.dev".to_string(),
            search_path_template: "/api/search/songs?query={query}".to_string(),
            priority: 2,
            timeout_ms: 10_000,
            container: ContainerHint::DataResults,
            stream: None,
            album_path_template: None,
        },
        BackendEndpoint {
            id: "piped".to_string(),
            base_url: "https://pipedapi.kavin.rocks".to_string(),
            search_path_template: "/search?q={query}&filter=music_songs".to_string(),
            priority: 3,
            timeout_ms: 10_000,
            container: ContainerHint::Items,
            stream: Some(StreamEndpoint {
                path_template: "/streams/{id}".to_string(),
                array_key: Some("audioStreams".to_string()),
            }),
            album_path_template: None,
        },
    ]
}

/// Read-only, priority-ordered list of backends.
#[derive(Debug, Clone)]
pub struct CandidateBackends {
    endpoints: Vec<BackendEndpoint>,
}

impl CandidateBackends {
    /// Build from an arbitrary list; sorted by priority, ties keep list order.
    pub fn new(mut endpoints: Vec<BackendEndpoint>) -> Self {
        endpoints.sort_by_key(|e| e.priority);
        Self { endpoints }
    }

    /// Build from the loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.backends.clone())
    }

    /// Backends in the order a search tries them.
    pub fn ordered(&self) -> &[BackendEndpoint] {
        &self.endpoints
    }

    /// Look up a backend by id.
    pub fn get(&self, id: &str) -> Option<&BackendEndpoint> {
        self.endpoints.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Default for CandidateBackends {
    fn default() -> Self {
        Self::new(default_endpoints())
    }
}
