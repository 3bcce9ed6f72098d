//! YouTube link handling.
//!
//! Every path that turns a user link into a video id goes through
//! [`extract_video_id`], and every track URL this crate emits is built by
//! [`canonical_url`]. Keeping both here means the router and the stream
//! adapter can never disagree about which video a link points at.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Host every track URL is canonicalized to.
pub const CANONICAL_WATCH_URL: &str = "https://youtube.com/watch?v=";

/// Query suffix marking tracks that were sourced from YouTube Music.
pub const MUSIC_META_SUFFIX: &str = "&dpymeta=ytmusic";

static SUBDOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:music|m|gaming)\.youtube\.com").expect("valid subdomain regex")
});

static YOUTUBE_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:[a-z0-9-]+\.)*(?:youtube\.com|youtu\.be|youtube-nocookie\.com)(?:[/?#]|$)")
        .expect("valid host regex")
});

static VIDEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid id regex"));

/// Rewrite `music.`, `m.` and `gaming.` YouTube hosts to `youtube.com`.
///
/// Scheme, path and query are left untouched.
pub fn normalize_host(raw: &str) -> String {
    SUBDOMAIN_RE.replace_all(raw, "youtube.com").into_owned()
}

/// Returns `true` if `raw` looks like a link to any YouTube host.
pub fn is_youtube_url(raw: &str) -> bool {
    YOUTUBE_HOST_RE.is_match(raw.trim())
}

/// Returns `true` for strings shaped like a bare 11-character video id.
pub fn is_video_id(raw: &str) -> bool {
    VIDEO_ID_RE.is_match(raw)
}

/// Parse a link, tolerating a missing scheme (`youtu.be/abc`).
fn parse_loose(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    Url::parse(raw).ok().or_else(|| {
        if raw.contains('.') && raw.contains('/') {
            Url::parse(&format!("https://{raw}")).ok()
        } else {
            None
        }
    })
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

/// Extract a video id from a link.
///
/// The `v` query parameter wins; otherwise the last non-empty path segment
/// is used, which covers `youtu.be/<id>`, `/shorts/<id>`, `/live/<id>` and
/// `/embed/<id>`. A string that is not a link at all is treated as the id.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let Some(url) = parse_loose(raw) else {
        let trimmed = raw.trim();
        return (!trimmed.is_empty() && !trimmed.contains(char::is_whitespace))
            .then(|| trimmed.to_string());
    };

    if let Some(id) = query_param(&url, "v") {
        return Some(id);
    }

    url.path_segments()?
        .rfind(|segment| !segment.is_empty())
        .map(ToString::to_string)
}

/// Extract the `list` query parameter from a link.
pub fn extract_list_id(raw: &str) -> Option<String> {
    parse_loose(raw).and_then(|url| query_param(&url, "list"))
}

/// Returns `true` when the link names both a video and a playlist, which is
/// how YouTube encodes mixes and "play from here" links.
pub fn is_mixed_playlist(raw: &str) -> bool {
    parse_loose(raw).is_some_and(|url| {
        query_param(&url, "v").is_some() && query_param(&url, "list").is_some()
    })
}

/// Build the canonical watch URL for a video id.
pub fn canonical_url(id: &str) -> String {
    format!("{CANONICAL_WATCH_URL}{id}")
}

/// Canonical watch URL tagged as YouTube Music sourced.
pub fn music_url(id: &str) -> String {
    format!("{CANONICAL_WATCH_URL}{id}{MUSIC_META_SUFFIX}")
}

/// Build the canonical playlist URL for a list id.
pub fn playlist_url(list_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={list_id}")
}

/// Compare two links by video id rather than by string equality.
pub fn same_video(a: &str, b: &str) -> bool {
    match (extract_video_id(a), extract_video_id(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
