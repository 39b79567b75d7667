//! Search, resolve and album commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::runtime::Runtime;

use crate::backends::CandidateBackends;
use crate::config::Config;
use crate::model::{SearchResult, Track};
use crate::player::format_duration;
use crate::source::{HttpClient, HttpFetch, SearchAggregator, StreamResolver};

/// Search and resolution without a playback session.
struct Sources {
    search: SearchAggregator,
    resolver: StreamResolver,
}

impl Sources {
    fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backends = Arc::new(CandidateBackends::from_config(config));
        if backends.is_empty() {
            anyhow::bail!("No backends configured");
        }
        let fetcher: Arc<dyn HttpFetch> = Arc::new(
            HttpClient::with_user_agent(&config.http.user_agent)
                .context("Failed to build HTTP client")?,
        );
        Ok(Self {
            search: SearchAggregator::new(Arc::clone(&backends), Arc::clone(&fetcher)),
            resolver: StreamResolver::new(backends, fetcher),
        })
    }

    /// Search and pick the `index`-th result.
    async fn pick(&self, query: &str, index: usize) -> anyhow::Result<(SearchResult, Track)> {
        let result = self.search.search(query).await?;
        print_failures(&result);
        let track = result.tracks.get(index).cloned().with_context(|| {
            format!(
                "Result {} out of range ({} results)",
                index,
                result.tracks.len()
            )
        })?;
        Ok((result, track))
    }
}

/// Search and print every result
pub fn cmd_search(rt: &Runtime, config: &Config, query: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let sources = Sources::from_config(config)?;
        let result = sources.search.search(query).await?;
        print_failures(&result);

        println!(
            "{} results for {:?} from {}:",
            result.tracks.len(),
            result.query,
            result.origin_backend
        );
        for (i, track) in result.tracks.iter().enumerate() {
            println!("{:>3}. {}", i, describe(track));
        }
        Ok(())
    })
}

/// Search, then resolve one result to a playable URL
pub fn cmd_resolve(
    rt: &Runtime,
    config: &Config,
    query: &str,
    index: usize,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let sources = Sources::from_config(config)?;
        let (_, track) = sources.pick(query, index).await?;
        println!("Resolving {}", describe(&track));

        let playable = sources
            .resolver
            .resolve_by_origin(&track)
            .await
            .with_context(|| format!("Failed to resolve {:?}", track.title))?;
        println!("{}", playable.stream_url.unwrap_or_default());
        Ok(())
    })
}

/// Search, then list the album one result belongs to
pub fn cmd_album(
    rt: &Runtime,
    config: &Config,
    query: &str,
    index: usize,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let sources = Sources::from_config(config)?;
        let (_, track) = sources.pick(query, index).await?;

        let tracks = sources.search.album_tracks(&track).await?;
        println!("Album of {} ({} tracks):", describe(&track), tracks.len());
        for (i, t) in tracks.iter().enumerate() {
            println!("{:>3}. {}", i, describe(t));
        }
        Ok(())
    })
}

fn print_failures(result: &SearchResult) {
    for failure in &result.failures {
        eprintln!("  skipped {}", failure);
    }
}

/// One-line summary: `Title - Artist (m:ss) [backend]`.
pub(crate) fn describe(track: &Track) -> String {
    let mut line = format!("{} - {}", track.title, track.artist_name);
    if let Some(ms) = track.duration_ms {
        line.push_str(&format!(" ({})", format_duration(Duration::from_millis(ms))));
    }
    line.push_str(&format!(" [{}]", track.backend));
    if track.is_playable() {
        line.push_str(" *");
    }
    line
}
