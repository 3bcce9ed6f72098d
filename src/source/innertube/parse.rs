//! InnerTube response parsing.
//!
//! InnerTube responses are deeply nested renderer trees whose exact layout
//! shifts between client versions. Rather than deserializing fixed paths, the
//! parsers walk the tree in document order and pick out the renderers they
//! know, the same way the page-data parsers elsewhere try several candidate
//! pointers before giving up.

use serde_json::Value;

use crate::source::{
    ChannelMeta, MixListing, PlaylistHeader, PlaylistItem, PlaylistPage, SearchItem, SongRecord,
    Thumbnail, VideoInfo, VideoRecord,
};
use crate::track::parse_timecode;

/// Visit every `(key, value)` pair of every object in document order.
///
/// `visit` returns `false` to skip descending into a value.
fn walk<'a>(value: &'a Value, visit: &mut dyn FnMut(&'a str, &'a Value) -> bool) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if visit(key, child) {
                    walk(child, visit);
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                walk(child, visit);
            }
        }
        _ => {}
    }
}

/// First value stored under `key` anywhere in the tree.
pub(crate) fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let mut found = None;
    walk(value, &mut |k, v| {
        if found.is_some() {
            return false;
        }
        if k == key {
            found = Some(v);
            return false;
        }
        true
    });
    found
}

/// Flatten a text node: `{ "simpleText": .. }` or `{ "runs": [{ "text": .. }] }`.
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    let value = value?;
    if let Some(s) = value.as_str() {
        return Some(s.to_string());
    }
    if let Some(s) = value.get("simpleText").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    if let Some(s) = value.get("content").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    let runs = value.get("runs")?.as_array()?;
    let joined: String = runs
        .iter()
        .filter_map(|r| r.get("text").and_then(Value::as_str))
        .collect();
    (!joined.is_empty()).then_some(joined)
}

fn first_run(value: Option<&Value>) -> Option<&Value> {
    value?.get("runs")?.as_array()?.first()
}

fn thumbnails(value: Option<&Value>) -> Vec<Thumbnail> {
    let Some(list) = value
        .and_then(|v| v.get("thumbnails").or_else(|| v.pointer("/thumbnail/thumbnails")))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|t| {
            let url = t.get("url")?.as_str()?;
            let url = if url.starts_with("//") {
                format!("https:{url}")
            } else {
                url.to_string()
            };
            Some(Thumbnail {
                url,
                width: as_u32(t.get("width")),
                height: as_u32(t.get("height")),
            })
        })
        .collect()
}

fn as_u32(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

/// Numbers InnerTube sends either as JSON numbers or as strings.
fn as_u64_lenient(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn canonical_base_url(run: Option<&Value>) -> Option<String> {
    run?.pointer("/navigationEndpoint/browseEndpoint/canonicalBaseUrl")
        .or_else(|| run?.pointer("/navigationEndpoint/commandMetadata/webCommandMetadata/url"))
        .and_then(Value::as_str)
        .map(|path| format!("https://www.youtube.com{path}"))
}

fn has_live_badge(renderer: &Value) -> bool {
    let badge_live = renderer
        .get("badges")
        .and_then(Value::as_array)
        .is_some_and(|badges| {
            badges.iter().any(|b| {
                b.pointer("/metadataBadgeRenderer/style").and_then(Value::as_str)
                    == Some("BADGE_STYLE_TYPE_LIVE_NOW")
            })
        });
    let overlay_live = renderer
        .get("thumbnailOverlays")
        .and_then(Value::as_array)
        .is_some_and(|overlays| {
            overlays.iter().any(|o| {
                o.pointer("/thumbnailOverlayTimeStatusRenderer/style").and_then(Value::as_str)
                    == Some("LIVE")
            })
        });
    badge_live || overlay_live
}

/// `videoRenderer` / `compactVideoRenderer` / `playlistVideoRenderer`.
fn video_renderer(renderer: &Value) -> Option<VideoRecord> {
    let id = renderer.get("videoId")?.as_str()?.to_string();
    let owner = renderer
        .get("ownerText")
        .or_else(|| renderer.get("longBylineText"))
        .or_else(|| renderer.get("shortBylineText"));

    let duration_seconds = as_u64_lenient(renderer.get("lengthSeconds"))
        .or_else(|| text(renderer.get("lengthText")).and_then(|t| parse_timecode(&t)));

    Some(VideoRecord {
        id,
        title: text(renderer.get("title")),
        author: first_run(owner)
            .and_then(|r| r.get("text"))
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| text(owner)),
        author_url: canonical_base_url(first_run(owner)),
        duration_seconds,
        thumbnails: thumbnails(renderer.get("thumbnail")),
        view_count_text: text(renderer.get("viewCountText")),
        is_live: has_live_badge(renderer),
        raw: renderer.clone(),
    })
}

/// Parse a `search` response.
pub fn search_results(root: &Value) -> Vec<SearchItem> {
    let mut items = Vec::new();
    walk(root, &mut |key, value| match key {
        "videoRenderer" => {
            if let Some(record) = video_renderer(value) {
                items.push(SearchItem::Video(record));
            }
            false
        }
        "channelRenderer" => {
            if let Some(id) = value.get("channelId").and_then(Value::as_str) {
                items.push(SearchItem::Channel {
                    id: id.to_string(),
                    name: text(value.get("title")),
                });
            }
            false
        }
        "radioRenderer" => {
            if let Some(id) = value.get("playlistId").and_then(Value::as_str) {
                items.push(SearchItem::Mix {
                    playlist_id: id.to_string(),
                });
            }
            false
        }
        "playlistRenderer" => {
            if let Some(id) = value.get("playlistId").and_then(Value::as_str) {
                items.push(SearchItem::Playlist {
                    playlist_id: id.to_string(),
                });
            }
            false
        }
        "shelfRenderer" | "reelShelfRenderer" | "horizontalCardListRenderer" => {
            items.push(SearchItem::Shelf);
            false
        }
        _ => true,
    });
    items
}

/// Parse a `player` response.
pub fn video_info(root: &Value) -> anyhow::Result<VideoInfo> {
    let status = root
        .pointer("/playabilityStatus/status")
        .and_then(Value::as_str)
        .unwrap_or("OK");
    let details = root.get("videoDetails");

    if details.is_none() || !matches!(status, "OK" | "LIVE_STREAM_OFFLINE") {
        let reason = root
            .pointer("/playabilityStatus/reason")
            .and_then(Value::as_str)
            .unwrap_or("no video details returned");
        anyhow::bail!("video unavailable ({status}): {reason}");
    }
    let details = details.unwrap_or(&Value::Null);

    let id = details
        .get("videoId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let record = VideoRecord {
        id,
        title: details.get("title").and_then(Value::as_str).map(String::from),
        author: details.get("author").and_then(Value::as_str).map(String::from),
        author_url: details
            .get("channelId")
            .and_then(Value::as_str)
            .map(|c| format!("https://www.youtube.com/channel/{c}")),
        duration_seconds: as_u64_lenient(details.get("lengthSeconds")),
        thumbnails: thumbnails(details.get("thumbnail")),
        view_count_text: details.get("viewCount").and_then(Value::as_str).map(String::from),
        is_live: details.get("isLive").and_then(Value::as_bool).unwrap_or(false),
        raw: details.clone(),
    };

    // Only the web microformat reports this; other clients omit it.
    let is_family_safe = root
        .pointer("/microformat/playerMicroformatRenderer/isFamilySafe")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    Ok(VideoInfo {
        record,
        is_family_safe,
        hls_manifest_url: root
            .pointer("/streamingData/hlsManifestUrl")
            .and_then(Value::as_str)
            .map(String::from),
        streaming_data: root.get("streamingData").cloned().unwrap_or(Value::Null),
    })
}

fn playlist_item(renderer: &Value) -> Option<PlaylistItem> {
    let id = renderer.get("videoId").and_then(Value::as_str).map(String::from);
    let playable = renderer.get("isPlayable").and_then(Value::as_bool).unwrap_or(true);
    let has_length = renderer.get("lengthSeconds").is_some() || renderer.get("lengthText").is_some();

    if !playable || !has_length {
        return Some(PlaylistItem::Unavailable { id });
    }
    video_renderer(renderer).map(PlaylistItem::Video)
}

fn continuation_token(renderer: &Value) -> Option<String> {
    renderer
        .pointer("/continuationEndpoint/continuationCommand/token")
        .or_else(|| find_key(renderer, "token"))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Parse a `browse` (first page) or continuation response of a playlist.
pub fn playlist_page(root: &Value) -> PlaylistPage {
    let mut page = PlaylistPage::default();

    walk(root, &mut |key, value| match key {
        "playlistVideoRenderer" => {
            if let Some(item) = playlist_item(value) {
                page.items.push(item);
            }
            false
        }
        "continuationItemRenderer" => {
            if page.continuation.is_none() {
                page.continuation = continuation_token(value);
            }
            false
        }
        "playlistSidebarSecondaryInfoRenderer" => {
            let owner = value.pointer("/videoOwner/videoOwnerRenderer/title");
            page.channel = Some(ChannelMeta {
                name: text(owner),
                url: canonical_base_url(first_run(owner)),
            });
            false
        }
        _ => true,
    });

    page.header = playlist_header(root);
    page
}

fn playlist_header(root: &Value) -> PlaylistHeader {
    let header = root.pointer("/header/playlistHeaderRenderer");
    let metadata = root.pointer("/metadata/playlistMetadataRenderer");
    let owner = header.and_then(|h| h.get("ownerText"));

    let thumbnail_url = find_key(root, "playlistVideoThumbnailRenderer")
        .map(|r| thumbnails(r.get("thumbnail")))
        .and_then(|thumbs| crate::track::best_thumbnail(&thumbs).map(|t| t.url.clone()));

    PlaylistHeader {
        title: metadata
            .and_then(|m| m.get("title"))
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| text(header.and_then(|h| h.get("title")))),
        description: metadata
            .and_then(|m| m.get("description"))
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| text(header.and_then(|h| h.get("descriptionText")))),
        thumbnail_url,
        author_name: text(owner),
        author_url: canonical_base_url(first_run(owner)),
    }
}

/// Parse the related videos of a `next` response.
pub fn related_videos(root: &Value) -> Vec<VideoRecord> {
    let mut records = Vec::new();
    walk(root, &mut |key, value| {
        if key == "compactVideoRenderer" {
            if let Some(record) = video_renderer(value) {
                records.push(record);
            }
            return false;
        }
        true
    });
    records
}

fn music_page_type(run: &Value) -> Option<&str> {
    run.pointer(
        "/navigationEndpoint/browseEndpoint/browseEndpointContextSupportedConfigs/browseEndpointContextMusicConfig/pageType",
    )
    .and_then(Value::as_str)
}

fn flex_column_runs(renderer: &Value, index: usize) -> Vec<&Value> {
    renderer
        .get("flexColumns")
        .and_then(|c| c.get(index))
        .and_then(|c| c.pointer("/musicResponsiveListItemFlexColumnRenderer/text/runs"))
        .and_then(Value::as_array)
        .map(|runs| runs.iter().collect())
        .unwrap_or_default()
}

fn music_list_item(renderer: &Value) -> SongRecord {
    let title_runs = flex_column_runs(renderer, 0);
    let detail_runs = flex_column_runs(renderer, 1);

    let id = renderer
        .pointer("/playlistItemData/videoId")
        .or_else(|| title_runs.first()?.pointer("/navigationEndpoint/watchEndpoint/videoId"))
        .and_then(Value::as_str)
        .map(String::from);

    let run_text = |run: &&Value| run.get("text").and_then(Value::as_str).map(String::from);

    let mut artists: Vec<String> = detail_runs
        .iter()
        .filter(|run| music_page_type(run) == Some("MUSIC_PAGE_TYPE_ARTIST"))
        .filter_map(run_text)
        .collect();
    if artists.is_empty() {
        // Unlinked artists: "Artist • Album • 3:45"
        if let Some(first) = detail_runs.first().and_then(run_text) {
            if first.trim() != "Song" {
                artists.push(first);
            } else if let Some(second) = detail_runs.get(2).and_then(run_text) {
                artists.push(second);
            }
        }
    }

    let album = detail_runs
        .iter()
        .find(|run| music_page_type(run) == Some("MUSIC_PAGE_TYPE_ALBUM"))
        .and_then(run_text);

    let duration_seconds = detail_runs
        .iter()
        .rev()
        .filter_map(run_text)
        .find_map(|t| t.contains(':').then(|| parse_timecode(&t)).flatten());

    SongRecord {
        id,
        title: title_runs.first().and_then(run_text),
        artists,
        album,
        duration_seconds,
        thumbnails: thumbnails(renderer.pointer("/thumbnail/musicThumbnailRenderer/thumbnail")),
        raw: renderer.clone(),
    }
}

/// Parse a YouTube Music `search` response filtered to songs.
pub fn music_songs(root: &Value) -> Vec<SongRecord> {
    let mut songs = Vec::new();
    walk(root, &mut |key, value| {
        if key == "musicResponsiveListItemRenderer" {
            songs.push(music_list_item(value));
            return false;
        }
        true
    });
    songs
}

/// Parse a YouTube Music `next` response into the queued mix.
pub fn music_up_next(root: &Value) -> MixListing {
    let title = find_key(root, "playlistPanelRenderer").and_then(|p| text(p.get("title")));
    let mut items = Vec::new();

    walk(root, &mut |key, value| {
        if key == "playlistPanelVideoRenderer" {
            if let Some(mut record) = video_renderer(value) {
                // "Artist • Album • 2019": keep the artist only
                if let Some(byline) = first_run(value.get("longBylineText")).and_then(|r| r.get("text")) {
                    record.author = byline.as_str().map(String::from);
                }
                items.push(record);
            }
            return false;
        }
        true
    });

    MixListing { title, items }
}

/// Returns `true` if an `account_menu` response belongs to a signed-in user.
pub fn is_signed_in(root: &Value) -> bool {
    find_key(root, "activeAccountHeaderRenderer").is_some()
}
