//! Tolerant multi-schema normalization of search responses.
//!
//! Mirrors disagree on almost every field name. Instead of probing fields
//! ad hoc, each canonical field has a prioritized alias table: a list of
//! JSON paths tried in order, first present non-empty value wins. Missing
//! fields fall back to defaults; only a record with neither id nor title
//! is dropped.
//!
//! Array selectors follow the convention these APIs share: the **last**
//! element of an image or download array is the highest quality.

use serde_json::Value;

use super::domain::ParseError;
use crate::backends::ContainerHint;
use crate::model::{Track, UNKNOWN_ARTIST};

/// One step of a JSON path.
#[derive(Debug, Clone, Copy)]
enum Seg {
    Key(&'static str),
    First,
    Last,
}

use Seg::{First, Key, Last};

type Path = &'static [Seg];

const ID_ALIASES: &[Path] = &[&[Key("id")], &[Key("videoId")], &[Key("trackId")]];

const TITLE_ALIASES: &[Path] = &[&[Key("title")], &[Key("name")]];

const ARTIST_ALIASES: &[Path] = &[
    &[Key("artist"), Key("name")],
    &[Key("uploaderName")],
    &[Key("artists"), Key("primary"), First, Key("name")],
];

const COVER_ALIASES: &[Path] = &[
    &[Key("album"), Key("cover_xl")],
    &[Key("album"), Key("cover_medium")],
    &[Key("thumbnail")],
    &[Key("image"), Last],
];

const ALBUM_ID_ALIASES: &[Path] = &[&[Key("album"), Key("id")]];

const STREAM_ALIASES: &[Path] = &[&[Key("preview")], &[Key("downloadUrl"), Last]];

/// Keys holding a URL inside an image / stream candidate object.
const URL_KEYS: &[&str] = &["url", "link"];

/// Output of a successful normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub tracks: Vec<Track>,
    /// Records skipped for lack of identity
    pub dropped: usize,
}

/// Normalize a raw search body into tracks tagged with `backend`.
///
/// The hinted container is tried first, then every other known nesting.
pub fn normalize(raw: &str, hint: ContainerHint, backend: &str) -> Result<Normalized, ParseError> {
    let root = parse_body(raw)?;
    let records = find_container(&root, hint).ok_or_else(|| {
        ParseError::UnexpectedShape(format!("no result array (hint: {:?})", hint))
    })?;

    let mut out = Normalized::default();
    for record in records {
        match normalize_record(record, backend) {
            Some(track) => out.tracks.push(track),
            None => out.dropped += 1,
        }
    }

    if out.dropped > 0 {
        tracing::debug!(backend, dropped = out.dropped, "Dropped records without identity");
    }
    Ok(out)
}

/// Parse a body as JSON, recognising HTML error pages up front.
pub(crate) fn parse_body(raw: &str) -> Result<Value, ParseError> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('<') {
        return Err(ParseError::Html);
    }
    serde_json::from_str(trimmed).map_err(|e| ParseError::Json(e.to_string()))
}

fn find_container(root: &Value, hint: ContainerHint) -> Option<&Vec<Value>> {
    std::iter::once(hint)
        .chain(ContainerHint::ALL.into_iter().filter(|h| *h != hint))
        .find_map(|h| container_at(root, h))
}

fn container_at(root: &Value, hint: ContainerHint) -> Option<&Vec<Value>> {
    match hint {
        ContainerHint::Items => root.get("items")?.as_array(),
        ContainerHint::Data => root.get("data")?.as_array(),
        ContainerHint::DataResults => root.get("data")?.get("results")?.as_array(),
        ContainerHint::RawArray => root.as_array(),
    }
}

/// Map one record; `None` when it has no identity.
fn normalize_record(record: &Value, backend: &str) -> Option<Track> {
    if !record.is_object() {
        return None;
    }

    let id = first_text(record, ID_ALIASES).or_else(|| watch_id(record));
    let title = first_text(record, TITLE_ALIASES);
    if id.is_none() && title.is_none() {
        return None;
    }

    Some(Track {
        id: id.unwrap_or_default(),
        backend: backend.to_string(),
        title: title.unwrap_or_default(),
        artist_name: first_text(record, ARTIST_ALIASES)
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album_id: first_text(record, ALBUM_ID_ALIASES),
        cover_url: first_text(record, COVER_ALIASES),
        duration_ms: duration_ms(record),
        stream_url: first_text(record, STREAM_ALIASES),
    })
}

fn first_text(record: &Value, aliases: &[Path]) -> Option<String> {
    aliases
        .iter()
        .find_map(|path| lookup(record, path).and_then(as_text))
}

fn lookup<'a>(value: &'a Value, path: &[Seg]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, seg| match seg {
        Seg::Key(k) => v.get(*k),
        Seg::First => v.as_array()?.first(),
        Seg::Last => v.as_array()?.last(),
    })
}

/// Leaf value as text: strings, numbers, or `{url|link}` objects.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => URL_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(as_text)),
        _ => None,
    }
}

/// Piped-style records only carry `url: "/watch?v=<id>"`.
fn watch_id(record: &Value) -> Option<String> {
    let url = record.get("url")?.as_str()?;
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("v="))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn duration_ms(record: &Value) -> Option<u64> {
    if let Some(secs) = record.get("duration").and_then(as_seconds) {
        return Some((secs * 1000.0).round() as u64);
    }
    record.get("durationMs").and_then(as_seconds).map(|ms| ms as u64)
}

fn as_seconds(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (n > 0.0).then_some(n)
}
