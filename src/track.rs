//! Canonical track and playlist values, and the builder that produces them
//! from upstream [`VideoRecord`]s.
//!
//! Building never fails: missing titles, authors, thumbnails and unparsable
//! view counts are replaced with sentinels so callers always get a complete
//! record.

use std::sync::{Arc, Weak};

use serde_json::json;

use crate::link;
use crate::source::{Thumbnail, VideoRecord};

pub const UNKNOWN_TITLE: &str = "UNKNOWN TITLE";
pub const UNKNOWN_AUTHOR: &str = "UNKNOWN AUTHOR";
pub const UNKNOWN_PLAYLIST: &str = "UNKNOWN PLAYLIST";
pub const UNKNOWN: &str = "Unknown";

/// Source tag carried by every track this crate builds.
pub const SOURCE_TAG: &str = "youtube";

/// Query kind carried by every track this crate builds.
pub const VIDEO_KIND: &str = "video";

/// Which catalog a record came from. Decides the URL suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOrigin {
    Primary,
    Music,
}

/// A playable track.
///
/// Immutable once built, except for [`Track::bridge`], which the bridging
/// engine sets when another track is used to satisfy playback.
#[derive(Debug, Clone)]
pub struct Track {
    pub title: String,
    pub author: String,
    /// Human readable duration (`3:32`, `1:02:03`).
    pub duration_text: String,
    pub duration_ms: u64,
    pub thumbnail_url: Option<String>,
    pub views: u64,
    /// Canonical `https://youtube.com/watch?v=<id>` URL for tracks built
    /// here; whatever the originating extractor used for foreign tracks.
    pub url: String,
    pub is_live: bool,
    pub source: String,
    pub query_kind: String,
    /// Upstream renderer the track was built from.
    pub raw: serde_json::Value,
    /// Non-owning back-reference to the playlist this track belongs to.
    pub playlist: Option<Weak<Playlist>>,
    /// Track actually streamed in place of this one.
    pub bridge: Option<Box<Track>>,
}

impl Track {
    /// A track discovered by another extractor, to be bridged onto YouTube.
    pub fn foreign(
        title: impl Into<String>,
        author: impl Into<String>,
        url: impl Into<String>,
        duration_ms: u64,
        source: impl Into<String>,
        query_kind: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            duration_text: format_duration(duration_ms / 1000),
            duration_ms,
            thumbnail_url: None,
            views: 0,
            url: url.into(),
            is_live: false,
            source: source.into(),
            query_kind: query_kind.into(),
            raw: serde_json::Value::Null,
            playlist: None,
            bridge: None,
        }
    }

    /// Video id of this track, if its URL names one.
    pub fn video_id(&self) -> Option<String> {
        link::extract_video_id(&self.url)
    }

    /// The owning playlist, if it is still alive.
    pub fn owning_playlist(&self) -> Option<Arc<Playlist>> {
        self.playlist.as_ref().and_then(Weak::upgrade)
    }

    /// JSON view for command line output.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "title": self.title,
            "author": self.author,
            "duration": self.duration_text,
            "duration_ms": self.duration_ms,
            "thumbnail": self.thumbnail_url,
            "views": self.views,
            "url": self.url,
            "live": self.is_live,
            "source": self.source,
            "query_kind": self.query_kind,
            "playlist": self.owning_playlist().map(|p| p.id.clone()),
            "bridge": self.bridge.as_ref().map(|b| b.to_json()),
        })
    }
}

/// Author of a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistAuthor {
    pub name: String,
    pub url: String,
}

/// Whether a playlist is a regular list or a generated mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    Playlist,
    Mix,
}

/// A playlist and the tracks it owns.
#[derive(Debug)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub author: PlaylistAuthor,
    pub kind: PlaylistKind,
    pub url: String,
    pub tracks: Vec<Track>,
}

/// Playlist metadata gathered before its tracks are built.
#[derive(Debug, Clone)]
pub struct PlaylistMeta {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub author: PlaylistAuthor,
    pub kind: PlaylistKind,
    pub url: String,
}

impl Playlist {
    /// Build the playlist and its tracks in one step so every track can hold
    /// a weak reference back to it.
    pub fn assemble(meta: PlaylistMeta, records: &[VideoRecord], origin: TrackOrigin) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let tracks = records
                .iter()
                .map(|record| build_track(record, origin, Some(weak)))
                .collect();

            Playlist {
                id: meta.id,
                title: meta.title,
                description: meta.description,
                thumbnail_url: meta.thumbnail_url,
                author: meta.author,
                kind: meta.kind,
                url: meta.url,
                tracks,
            }
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "title": self.title,
            "description": self.description,
            "thumbnail": self.thumbnail_url,
            "author": { "name": self.author.name, "url": self.author.url },
            "mix": self.kind == PlaylistKind::Mix,
            "url": self.url,
            "tracks": self.tracks.len(),
        })
    }
}

/// Normalize an upstream record into a [`Track`].
pub fn build_track(record: &VideoRecord, origin: TrackOrigin, playlist: Option<&Weak<Playlist>>) -> Track {
    let seconds = record.duration_seconds.unwrap_or(0);
    let url = match origin {
        TrackOrigin::Primary => link::canonical_url(&record.id),
        TrackOrigin::Music => link::music_url(&record.id),
    };

    Track {
        title: non_empty(record.title.as_deref()).unwrap_or(UNKNOWN_TITLE).to_string(),
        author: non_empty(record.author.as_deref()).unwrap_or(UNKNOWN_AUTHOR).to_string(),
        duration_text: format_duration(seconds),
        duration_ms: seconds * 1000,
        thumbnail_url: best_thumbnail(&record.thumbnails).map(|t| t.url.clone()),
        views: record.view_count_text.as_deref().map_or(0, parse_view_count),
        url,
        is_live: record.is_live,
        source: SOURCE_TAG.to_string(),
        query_kind: VIDEO_KIND.to_string(),
        raw: record.raw.clone(),
        playlist: playlist.cloned(),
        bridge: None,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The largest thumbnail by pixel area, ignoring entries without a URL.
pub fn best_thumbnail(thumbnails: &[Thumbnail]) -> Option<&Thumbnail> {
    thumbnails
        .iter()
        .filter(|t| !t.url.is_empty())
        .max_by_key(|t| u64::from(t.width) * u64::from(t.height))
}

/// Parse a displayed view count such as `"1,234,567 views"`.
///
/// Group separators inside the leading number are dropped. Anything else,
/// including abbreviated counts like `1.2M`, yields `0`.
pub fn parse_view_count(text: &str) -> u64 {
    let text = text.trim();
    let is_number_char =
        |c: char| c.is_ascii_digit() || matches!(c, ',' | '.' | '_' | '\u{a0}' | '\u{202f}');

    let end = text.find(|c: char| !is_number_char(c)).unwrap_or(text.len());
    let (number, rest) = text.split_at(end);

    // "1.2M" style abbreviations
    if rest.chars().next().is_some_and(char::is_alphabetic) {
        return 0;
    }

    number
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// Format seconds as `m:ss` or `h:mm:ss`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Parse `m:ss` / `h:mm:ss` timecodes back into seconds.
pub fn parse_timecode(text: &str) -> Option<u64> {
    text.trim()
        .split(':')
        .try_fold(0u64, |acc, part| Some(acc * 60 + part.trim().parse::<u64>().ok()?))
}
