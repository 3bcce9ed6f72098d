//! Query classification and routing.
//!
//! [`QueryResolver::resolve`] is total: lookups that fail or find nothing are
//! logged and come back as [`ResolutionResult::empty`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::link;
use crate::playlist::PlaylistResolver;
use crate::source::{ClientVariant, PrimarySource, SearchItem};
use crate::track::{build_track, Playlist, Track, TrackOrigin};

/// How a query should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Video,
    Playlist,
    Search,
    /// Search chosen by the host because the input looked like free text.
    AutoSearch,
    /// A protocol that always means "search", whatever the input looks like.
    RawSearchProtocol,
}

impl QueryType {
    /// Classify a raw input string.
    pub fn detect(raw: &str) -> Self {
        let raw = raw.trim();
        if link::is_youtube_url(raw) {
            if link::extract_list_id(raw).is_some() {
                Self::Playlist
            } else {
                Self::Video
            }
        } else if link::is_video_id(raw) {
            Self::Video
        } else {
            Self::AutoSearch
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Playlist => "playlist",
            Self::Search => "search",
            Self::AutoSearch => "auto",
            Self::RawSearchProtocol => "raw",
        }
    }

    fn is_search(self) -> bool {
        matches!(self, Self::Search | Self::AutoSearch | Self::RawSearchProtocol)
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "playlist" => Ok(Self::Playlist),
            "search" => Ok(Self::Search),
            "auto" | "autosearch" => Ok(Self::AutoSearch),
            "raw" => Ok(Self::RawSearchProtocol),
            other => Err(format!("unknown query type: {other}")),
        }
    }
}

/// A user query and its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub raw: String,
    pub declared: QueryType,
}

impl Query {
    pub fn new(raw: impl Into<String>, declared: QueryType) -> Self {
        Self {
            raw: raw.into(),
            declared,
        }
    }

    /// Build a query whose type is inferred from `raw`.
    pub fn detect(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let declared = QueryType::detect(&raw);
        Self { raw, declared }
    }
}

/// Outcome of resolving a [`Query`].
///
/// When `playlist` is set, `tracks` holds the same tracks as the playlist.
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    pub playlist: Option<Arc<Playlist>>,
    pub tracks: Vec<Track>,
}

impl ResolutionResult {
    /// The canonical "nothing found" result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_playlist(playlist: Arc<Playlist>) -> Self {
        Self {
            tracks: playlist.tracks.clone(),
            playlist: Some(playlist),
        }
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self {
            playlist: None,
            tracks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.playlist.is_none() && self.tracks.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "playlist": self.playlist.as_ref().map(|p| p.to_json()),
            "tracks": self.tracks.iter().map(Track::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Routes queries to video lookup, playlist resolution or search.
pub struct QueryResolver {
    primary: Arc<dyn PrimarySource>,
    playlists: PlaylistResolver,
}

impl QueryResolver {
    pub fn new(primary: Arc<dyn PrimarySource>, playlists: PlaylistResolver) -> Self {
        Self { primary, playlists }
    }

    pub fn playlists(&self) -> &PlaylistResolver {
        &self.playlists
    }

    /// Resolve `query`, returning an empty result on any failure.
    #[instrument(skip(self, query), fields(query = %query.raw, kind = %query.declared))]
    pub async fn resolve(&self, query: &Query) -> ResolutionResult {
        match self.try_resolve(query).await {
            Ok(result) => result,
            Err(Error::NotFound(what)) => {
                info!(%what, "Nothing found");
                ResolutionResult::empty()
            }
            Err(e) => {
                warn!(error = %e, "Resolution failed");
                ResolutionResult::empty()
            }
        }
    }

    /// Resolve `query`, reporting why nothing was found.
    pub async fn try_resolve(&self, query: &Query) -> Result<ResolutionResult> {
        let kind = if query.declared == QueryType::RawSearchProtocol {
            QueryType::Search
        } else {
            query.declared
        };

        if kind.is_search() {
            let tracks = self.search(&query.raw).await?;
            if tracks.is_empty() {
                return Err(Error::NotFound(format!("{:?}", query.raw)));
            }
            return Ok(ResolutionResult::from_tracks(tracks));
        }

        let raw = if link::is_youtube_url(&query.raw) {
            link::normalize_host(query.raw.trim())
        } else {
            query.raw.trim().to_string()
        };

        let result = match kind {
            QueryType::Playlist => self.playlist(&raw).await?,
            _ => self.video(&raw).await?,
        };
        if result.tracks.is_empty() {
            return Err(Error::NotFound(raw));
        }
        Ok(result)
    }

    /// Free-text search, keeping plain video results in upstream order.
    pub async fn search(&self, text: &str) -> Result<Vec<Track>> {
        let items = self.primary.search(text).await?;
        let total = items.len();
        let tracks: Vec<Track> = items
            .into_iter()
            .filter_map(|item| match item {
                SearchItem::Video(record) => Some(build_track(&record, TrackOrigin::Primary, None)),
                _ => None,
            })
            .collect();
        debug!(total, videos = tracks.len(), "Search results filtered");
        Ok(tracks)
    }

    async fn video(&self, raw: &str) -> Result<ResolutionResult> {
        let id = link::extract_video_id(raw)
            .ok_or_else(|| Error::InvalidQuery(format!("no video id in {raw}")))?;
        let info = self.primary.basic_info(&id, ClientVariant::Web).await?;
        let track = build_track(&info.record, TrackOrigin::Primary, None);
        Ok(ResolutionResult::from_tracks(vec![track]))
    }

    async fn playlist(&self, raw: &str) -> Result<ResolutionResult> {
        let playlist = if link::is_mixed_playlist(raw) {
            let (Some(video_id), Some(list_id)) = (link::extract_video_id(raw), link::extract_list_id(raw))
            else {
                return Err(Error::InvalidQuery(format!("malformed mix link {raw}")));
            };
            self.playlists.resolve_mix(&video_id, &list_id).await?
        } else {
            let list_id = link::extract_list_id(raw)
                .or_else(|| (!raw.is_empty() && !raw.contains(['/', ' '])).then(|| raw.to_string()))
                .ok_or_else(|| Error::InvalidQuery(format!("no playlist id in {raw}")))?;
            self.playlists.resolve(&list_id).await?
        };
        Ok(ResolutionResult::from_playlist(playlist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{video, MockSource};
    use crate::source::{MixListing, PlaylistItem, PlaylistPage};

    fn setup(source: MockSource) -> (Arc<MockSource>, QueryResolver) {
        let source = Arc::new(source);
        let playlists = PlaylistResolver::new(source.clone(), source.clone());
        (source.clone(), QueryResolver::new(source, playlists))
    }

    #[test]
    fn detects_query_types() {
        assert_eq!(QueryType::detect("https://youtu.be/dQw4w9WgXcQ"), QueryType::Video);
        assert_eq!(
            QueryType::detect("https://www.youtube.com/playlist?list=PL1"),
            QueryType::Playlist
        );
        assert_eq!(
            QueryType::detect("https://youtube.com/watch?v=abc123&list=RD1"),
            QueryType::Playlist
        );
        assert_eq!(QueryType::detect("dQw4w9WgXcQ"), QueryType::Video);
        assert_eq!(QueryType::detect("never gonna give you up"), QueryType::AutoSearch);
    }

    #[test]
    fn parses_query_type_names() {
        assert_eq!("raw".parse::<QueryType>(), Ok(QueryType::RawSearchProtocol));
        assert_eq!("Playlist".parse::<QueryType>(), Ok(QueryType::Playlist));
        assert!("album".parse::<QueryType>().is_err());
    }

    #[tokio::test]
    async fn search_keeps_only_videos() {
        let (_, resolver) = setup(MockSource::new().with_search(
            "lofi",
            vec![
                SearchItem::Channel { id: "UC1".into(), name: None },
                SearchItem::Video(video("v1", "One", "A")),
                SearchItem::Mix { playlist_id: "RD1".into() },
                SearchItem::Shelf,
                SearchItem::Video(video("v2", "Two", "B")),
            ],
        ));
        let result = resolver.resolve(&Query::new("lofi", QueryType::Search)).await;
        assert!(result.playlist.is_none());
        let titles: Vec<_> = result.tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[tokio::test]
    async fn raw_search_protocol_ignores_url_shape() {
        let raw = "https://youtube.com/watch?v=abc123";
        let (source, resolver) =
            setup(MockSource::new().with_search(raw, vec![SearchItem::Video(video("v1", "One", "A"))]));
        let result = resolver.resolve(&Query::new(raw, QueryType::RawSearchProtocol)).await;
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(source.calls(), vec![format!("search:{raw}")]);
    }

    #[tokio::test]
    async fn video_link_is_looked_up_by_id() {
        let (source, resolver) = setup(MockSource::new().with_info(video("abc123", "Song", "A"), true, None));
        let result = resolver
            .resolve(&Query::new("https://music.youtube.com/watch?v=abc123&si=x", QueryType::Video))
            .await;
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(result.tracks[0].url, "https://youtube.com/watch?v=abc123");
        assert_eq!(source.calls(), vec!["basic_info:abc123:web"]);
    }

    #[tokio::test]
    async fn short_links_resolve_to_same_id() {
        let (source, resolver) = setup(MockSource::new().with_info(video("abc123", "Song", "A"), true, None));
        resolver.resolve(&Query::new("https://youtu.be/abc123", QueryType::Video)).await;
        assert_eq!(source.calls(), vec!["basic_info:abc123:web"]);
    }

    #[tokio::test]
    async fn playlist_result_mirrors_playlist_tracks() {
        let page = PlaylistPage {
            items: vec![PlaylistItem::Video(video("a", "A", "X")), PlaylistItem::Video(video("b", "B", "X"))],
            ..PlaylistPage::default()
        };
        let (_, resolver) = setup(MockSource::new().with_page("PL1", page));
        let result = resolver
            .resolve(&Query::new("https://www.youtube.com/playlist?list=PL1", QueryType::Playlist))
            .await;

        let playlist = result.playlist.as_ref().unwrap();
        let from_result: Vec<_> = result.tracks.iter().map(|t| t.url.clone()).collect();
        let from_playlist: Vec<_> = playlist.tracks.iter().map(|t| t.url.clone()).collect();
        assert_eq!(from_result, from_playlist);
        assert_eq!(from_result.len(), 2);
    }

    #[tokio::test]
    async fn mixed_link_goes_through_music_source() {
        let mix = MixListing {
            title: None,
            items: vec![video("abc123", "Seed", "A"), video("zzz999", "Next", "B")],
        };
        let (source, resolver) = setup(MockSource::new().with_mix("abc123", "PL1", mix));
        let result = resolver
            .resolve(&Query::new("https://youtube.com/watch?v=abc123&list=PL1", QueryType::Playlist))
            .await;
        assert!(result.tracks[0].url.contains("abc123"));
        assert_eq!(source.calls(), vec!["up_next:abc123:PL1"]);
    }

    #[tokio::test]
    async fn failures_and_misses_are_empty() {
        let (_, resolver) = setup(MockSource::new().failing_search());
        assert!(resolver.resolve(&Query::new("x", QueryType::Search)).await.is_empty());

        let (_, resolver) = setup(MockSource::new());
        assert!(resolver.resolve(&Query::new("nothing", QueryType::AutoSearch)).await.is_empty());
        assert!(resolver
            .resolve(&Query::new("https://youtube.com/playlist?list=PLnope", QueryType::Playlist))
            .await
            .is_empty());
        assert!(resolver
            .resolve(&Query::new("https://youtube.com/watch?v=gone", QueryType::Video))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn empty_playlist_is_not_found() {
        let (_, resolver) = setup(MockSource::new().with_page("PL0", PlaylistPage::default()));
        let err = resolver
            .try_resolve(&Query::new("https://youtube.com/playlist?list=PL0", QueryType::Playlist))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
