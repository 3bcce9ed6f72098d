//! Upstream media sources.
//!
//! A [`PrimarySource`] is the YouTube catalog: search, video info, playlists
//! and chunked downloads. A [`SecondarySource`] is YouTube Music: song search
//! and mix ("up next") listings. Both report raw upstream records which the
//! track builder normalizes; neither knows about [`crate::Track`].
//!
//! [`innertube::InnerTube`] implements both over an injected
//! [`crate::fetch::Fetcher`]. Tests substitute in-memory sources.

pub mod client;
pub mod innertube;
#[cfg(test)]
pub(crate) mod mock;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

pub use client::ClientVariant;

use crate::session::Credentials;

/// A single thumbnail variant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Video metadata as reported upstream, before normalization.
///
/// Everything but the id is optional; upstream renderers routinely omit
/// fields for region-locked, deleted or live content.
#[derive(Debug, Clone, Default)]
pub struct VideoRecord {
    pub id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub duration_seconds: Option<u64>,
    pub thumbnails: Vec<Thumbnail>,
    /// View count as displayed, e.g. `"1,234,567 views"`.
    pub view_count_text: Option<String>,
    pub is_live: bool,
    /// The upstream renderer this record was parsed from.
    pub raw: serde_json::Value,
}

/// One entry of a search result page.
#[derive(Debug, Clone)]
pub enum SearchItem {
    /// A plain video result.
    Video(VideoRecord),
    Channel { id: String, name: Option<String> },
    Mix { playlist_id: String },
    Playlist { playlist_id: String },
    /// Shelves, ads and other container renderers.
    Shelf,
}

/// Result of a basic info lookup for one video.
#[derive(Debug, Clone, Default)]
pub struct VideoInfo {
    pub record: VideoRecord,
    pub is_family_safe: bool,
    /// HLS manifest for live content, when the client variant exposes one.
    pub hls_manifest_url: Option<String>,
    /// Source-specific playback data returned with the lookup, reused by
    /// [`PrimarySource::download`]. `Null` when the source has none.
    pub streaming_data: serde_json::Value,
}

/// One entry of a playlist page.
#[derive(Debug, Clone)]
pub enum PlaylistItem {
    /// A regular, playable playlist video.
    Video(VideoRecord),
    /// Deleted or private placeholder.
    Unavailable { id: Option<String> },
}

/// Playlist-level metadata from the first page.
#[derive(Debug, Clone, Default)]
pub struct PlaylistHeader {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
}

/// Channel metadata reported alongside a playlist.
#[derive(Debug, Clone, Default)]
pub struct ChannelMeta {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// One page of a playlist listing.
#[derive(Debug, Clone, Default)]
pub struct PlaylistPage {
    pub header: PlaylistHeader,
    pub channel: Option<ChannelMeta>,
    pub items: Vec<PlaylistItem>,
    /// Opaque token for the next page; `None` on the last page.
    pub continuation: Option<String>,
}

/// A song result from the music catalog.
#[derive(Debug, Clone, Default)]
pub struct SongRecord {
    /// Missing for songs the catalog cannot map to a video.
    pub id: Option<String>,
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_seconds: Option<u64>,
    pub thumbnails: Vec<Thumbnail>,
    pub raw: serde_json::Value,
}

impl SongRecord {
    /// Convert to a video record; `None` when the song has no video id.
    pub fn to_video_record(&self) -> Option<VideoRecord> {
        let id = self.id.as_ref().filter(|id| !id.is_empty())?;
        Some(VideoRecord {
            id: id.clone(),
            title: self.title.clone(),
            author: (!self.artists.is_empty()).then(|| self.artists.join(", ")),
            author_url: None,
            duration_seconds: self.duration_seconds,
            thumbnails: self.thumbnails.clone(),
            view_count_text: None,
            is_live: false,
            raw: self.raw.clone(),
        })
    }
}

/// A mix listing (video id + list id) from the music catalog.
#[derive(Debug, Clone, Default)]
pub struct MixListing {
    pub title: Option<String>,
    pub items: Vec<VideoRecord>,
}

/// Requested download quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Best,
    Lowest,
}

/// Which tracks of the media to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    #[default]
    AudioOnly,
    VideoAndAudio,
}

/// Container format of the downloaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    /// MP4 / M4A: AAC audio, playable nearly everywhere.
    #[default]
    Mp4,
    Webm,
    /// Whatever the best format happens to be.
    Any,
}

impl Container {
    /// Returns `true` if a MIME type such as `audio/mp4; codecs="mp4a.40.2"`
    /// belongs to this container.
    pub fn matches_mime(self, mime: &str) -> bool {
        match self {
            Self::Mp4 => mime.contains("/mp4"),
            Self::Webm => mime.contains("/webm"),
            Self::Any => true,
        }
    }
}

/// Parameters of a download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadOptions {
    pub quality: Quality,
    pub kind: MediaKind,
    pub container: Container,
    pub client: ClientVariant,
}

/// Ordered media chunks of a download.
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// The YouTube catalog.
#[async_trait]
pub trait PrimarySource: Send + Sync {
    /// Short lowercase source name used in logs.
    fn name(&self) -> &'static str;

    /// Free-text search. Results are returned in upstream order.
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>>;

    /// Basic info for one video, fetched as the given client.
    async fn basic_info(&self, video_id: &str, client: ClientVariant) -> Result<VideoInfo>;

    /// First page of a playlist.
    async fn playlist(&self, list_id: &str) -> Result<PlaylistPage>;

    /// A later page of a playlist. The returned header may be empty.
    async fn playlist_continuation(&self, token: &str) -> Result<PlaylistPage>;

    /// Download media as a stream of ordered chunks.
    ///
    /// `info` comes from [`basic_info`](Self::basic_info) with the same
    /// client variant, so its playback data can be used without another
    /// lookup.
    async fn download(&self, info: &VideoInfo, options: DownloadOptions) -> Result<ChunkStream>;

    /// Videos related to `video_id`. Returns an empty vec by default.
    async fn related(&self, video_id: &str) -> Result<Vec<VideoRecord>> {
        let _ = video_id;
        Ok(vec![])
    }

    /// Check that `credentials` are accepted upstream.
    async fn verify_credentials(&self, credentials: &Credentials) -> Result<()>;
}

/// The YouTube Music catalog.
#[async_trait]
pub trait SecondarySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Search restricted to songs.
    async fn search_songs(&self, query: &str) -> Result<Vec<SongRecord>>;

    /// The mix seeded by `video_id` within `list_id`, in play order.
    async fn up_next(&self, video_id: &str, list_id: &str) -> Result<MixListing>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_without_id_has_no_video_record() {
        let song = SongRecord {
            id: None,
            title: Some("Song".into()),
            ..SongRecord::default()
        };
        assert!(song.to_video_record().is_none());

        let empty = SongRecord {
            id: Some(String::new()),
            ..SongRecord::default()
        };
        assert!(empty.to_video_record().is_none());
    }

    #[test]
    fn song_artists_become_author() {
        let song = SongRecord {
            id: Some("abc123".into()),
            title: Some("Song".into()),
            artists: vec!["A".into(), "B".into()],
            duration_seconds: Some(200),
            ..SongRecord::default()
        };
        let record = song.to_video_record().unwrap();
        assert_eq!(record.id, "abc123");
        assert_eq!(record.author.as_deref(), Some("A, B"));
        assert_eq!(record.duration_seconds, Some(200));
        assert!(!record.is_live);
    }

    #[test]
    fn container_mime_matching() {
        assert!(Container::Mp4.matches_mime("audio/mp4; codecs=\"mp4a.40.2\""));
        assert!(!Container::Mp4.matches_mime("audio/webm; codecs=\"opus\""));
        assert!(Container::Webm.matches_mime("audio/webm; codecs=\"opus\""));
        assert!(Container::Any.matches_mime("video/3gpp"));
    }
}
