//! Bridging tracks from other extractors onto YouTube.
//!
//! A track found elsewhere (a Spotify song, a SoundCloud link that cannot be
//! streamed) is matched against YouTube Music first or YouTube search first,
//! depending on the [`BridgeProtocol`]. The attempts are strictly sequential:
//! the music lookup finishes, matched or not, before the search fallback
//! starts.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::resolver::{Query, QueryResolver, QueryType};
use crate::session::Session;
use crate::source::{PrimarySource, SecondarySource};
use crate::stream::{acquire_stream, Streamable};
use crate::track::{build_track, Track, TrackOrigin};

/// Identity of this extractor. Tracks it produced skip bridging.
pub const EXTRACTOR_IDENTIFIER: &str = "tubelink.youtube";

/// Key of the fallback entry in [`BridgeSetting::PerKind`].
pub const DEFAULT_KEY: &str = "default";

/// Which catalog is searched first when bridging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeProtocol {
    /// YouTube search.
    Primary,
    /// YouTube Music song search, falling back to YouTube search.
    Secondary,
}

impl fmt::Display for BridgeProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        })
    }
}

impl FromStr for BridgeProtocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" | "youtube" => Ok(Self::Primary),
            "secondary" | "music" | "youtube_music" => Ok(Self::Secondary),
            other => Err(format!("unknown bridge protocol: {other}")),
        }
    }
}

/// Caller-chosen protocol: one for everything, or one per query kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeSetting {
    Fixed(BridgeProtocol),
    /// Keyed by [`Track::query_kind`], with [`DEFAULT_KEY`] as fallback.
    PerKind(HashMap<String, BridgeProtocol>),
}

impl BridgeSetting {
    /// Protocol for tracks of `query_kind`, if the setting names one.
    pub fn protocol_for(&self, query_kind: &str) -> Option<BridgeProtocol> {
        match self {
            Self::Fixed(protocol) => Some(*protocol),
            Self::PerKind(map) => map.get(query_kind).or_else(|| map.get(DEFAULT_KEY)).copied(),
        }
    }
}

/// Builds the search string used to find a bridge match.
pub type BridgeQueryBuilder = Arc<dyn Fn(&Track, BridgeProtocol) -> String + Send + Sync>;

/// Outcome of the YouTube Music attempt.
#[derive(Debug)]
pub enum SecondaryAttempt {
    /// The top song, with its stream already acquired.
    Matched { track: Track, stream: Streamable },
    /// No songs, or the top song has no video id.
    SoftMiss,
    /// The lookup failed, or the matched song could not be streamed.
    HardFailure(anyhow::Error),
}

/// The bridging engine.
pub struct Bridge {
    primary: Arc<dyn PrimarySource>,
    secondary: Arc<dyn SecondarySource>,
    resolver: Arc<QueryResolver>,
    session: Arc<Session>,
    setting: Option<BridgeSetting>,
    query_builder: Option<BridgeQueryBuilder>,
}

impl Bridge {
    pub fn new(
        primary: Arc<dyn PrimarySource>,
        secondary: Arc<dyn SecondarySource>,
        resolver: Arc<QueryResolver>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            primary,
            secondary,
            resolver,
            session,
            setting: None,
            query_builder: None,
        }
    }

    #[must_use]
    pub fn with_setting(mut self, setting: Option<BridgeSetting>) -> Self {
        self.setting = setting;
        self
    }

    #[must_use]
    pub fn with_query_builder(mut self, builder: BridgeQueryBuilder) -> Self {
        self.query_builder = Some(builder);
        self
    }

    /// Protocol for `track`: the explicit setting, else music search when
    /// signed in, else plain search.
    pub async fn protocol_for(&self, track: &Track) -> BridgeProtocol {
        if let Some(protocol) = self
            .setting
            .as_ref()
            .and_then(|s| s.protocol_for(&track.query_kind))
        {
            return protocol;
        }
        if self.session.is_authenticated().await {
            BridgeProtocol::Secondary
        } else {
            BridgeProtocol::Primary
        }
    }

    /// Search string for `track` under `protocol`.
    pub fn query_for(&self, track: &Track, protocol: BridgeProtocol) -> String {
        if let Some(builder) = &self.query_builder {
            return builder(track, protocol);
        }
        let query = format!("{} - {}", track.author, track.title);
        match protocol {
            BridgeProtocol::Primary => format!("{query} (official audio)"),
            BridgeProtocol::Secondary => query,
        }
    }

    /// Look `query` up in the music catalog and stream the top song.
    pub async fn try_secondary(&self, query: &str) -> SecondaryAttempt {
        let songs = match self.secondary.search_songs(query).await {
            Ok(songs) => songs,
            Err(e) => return SecondaryAttempt::HardFailure(e),
        };
        let Some(record) = songs.first().and_then(|s| s.to_video_record()) else {
            return SecondaryAttempt::SoftMiss;
        };

        let track = build_track(&record, TrackOrigin::Music, None);
        match acquire_stream(self.primary.as_ref(), &track).await {
            Ok(stream) => SecondaryAttempt::Matched { track, stream },
            Err(e) => {
                let context = format!("streaming music match {}", track.url);
                SecondaryAttempt::HardFailure(anyhow::Error::new(e).context(context))
            }
        }
    }

    /// Stream `track`, bridging it onto YouTube when it came from another
    /// extractor.
    ///
    /// The matched track is stored in `track.bridge` once its stream has
    /// been acquired. Returns `Ok(None)` when neither catalog has a match.
    #[instrument(skip(self, track), fields(title = %track.title, source = %track.source))]
    pub async fn bridge(&self, track: &mut Track, extractor: Option<&str>) -> Result<Option<Streamable>> {
        if extractor == Some(EXTRACTOR_IDENTIFIER) {
            debug!("Track is already a YouTube track, streaming directly");
            return acquire_stream(self.primary.as_ref(), track).await.map(Some);
        }

        let protocol = self.protocol_for(track).await;
        let query = self.query_for(track, protocol);
        debug!(%protocol, %query, "Bridging");

        if protocol == BridgeProtocol::Secondary {
            match self.try_secondary(&query).await {
                SecondaryAttempt::Matched { track: found, stream } => {
                    info!(url = %found.url, "Bridged through music search");
                    track.bridge = Some(Box::new(found));
                    return Ok(Some(stream));
                }
                SecondaryAttempt::SoftMiss => {
                    debug!("No music match, falling back to search");
                }
                SecondaryAttempt::HardFailure(e) => {
                    warn!(error = %format!("{e:#}"), "Music bridge failed, falling back to search");
                }
            }
        }

        let result = self.resolver.resolve(&Query::new(query, QueryType::Search)).await;
        let Some(found) = result.tracks.into_iter().next() else {
            info!("No bridge match found");
            return Ok(None);
        };
        info!(url = %found.url, "Bridged through search");
        let stream = acquire_stream(self.primary.as_ref(), &found).await?;
        track.bridge = Some(Box::new(found));
        Ok(Some(stream))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::playlist::PlaylistResolver;
    use crate::session::Credentials;
    use crate::source::mock::{video, MockSource};
    use crate::source::{SearchItem, SongRecord};

    fn song(id: Option<&str>, title: &str) -> SongRecord {
        SongRecord {
            id: id.map(String::from),
            title: Some(title.to_string()),
            artists: vec!["Artist".into()],
            ..SongRecord::default()
        }
    }

    fn playable(source: MockSource, id: &str) -> MockSource {
        source
            .with_info(video(id, "Song", "Artist"), true, None)
            .with_media(id, vec![Ok(Bytes::from_static(b"audio"))])
    }

    fn engine(source: MockSource) -> (Arc<MockSource>, Arc<Session>, Bridge) {
        let source = Arc::new(source);
        let session = Arc::new(Session::new());
        let resolver = Arc::new(QueryResolver::new(
            source.clone(),
            PlaylistResolver::new(source.clone(), source.clone()),
        ));
        let bridge = Bridge::new(source.clone(), source.clone(), resolver, session.clone());
        (source, session, bridge)
    }

    fn spotify_track() -> Track {
        Track::foreign("Song", "Artist", "https://open.spotify.com/track/1", 200_000, "spotify", "spotifySong")
    }

    #[test]
    fn per_kind_setting_falls_back_to_default() {
        let setting = BridgeSetting::PerKind(HashMap::from([
            ("spotifySong".to_string(), BridgeProtocol::Secondary),
            (DEFAULT_KEY.to_string(), BridgeProtocol::Primary),
        ]));
        assert_eq!(setting.protocol_for("spotifySong"), Some(BridgeProtocol::Secondary));
        assert_eq!(setting.protocol_for("soundcloudTrack"), Some(BridgeProtocol::Primary));
        assert_eq!(BridgeSetting::PerKind(HashMap::new()).protocol_for("x"), None);
        assert_eq!(
            BridgeSetting::Fixed(BridgeProtocol::Secondary).protocol_for("x"),
            Some(BridgeProtocol::Secondary)
        );
    }

    #[tokio::test]
    async fn protocol_follows_session_without_setting() {
        let (source, session, bridge) = engine(MockSource::new());
        let track = spotify_track();
        assert_eq!(bridge.protocol_for(&track).await, BridgeProtocol::Primary);

        let creds = Credentials { cookie: Some("valid".into()), access_token: None };
        session.sign_in(source.as_ref(), creds, false).await.unwrap();
        assert_eq!(bridge.protocol_for(&track).await, BridgeProtocol::Secondary);

        let bridge = bridge.with_setting(Some(BridgeSetting::Fixed(BridgeProtocol::Primary)));
        assert_eq!(bridge.protocol_for(&track).await, BridgeProtocol::Primary);
    }

    #[test]
    fn synthesized_queries() {
        let (_, _, bridge) = engine(MockSource::new());
        let track = spotify_track();
        assert_eq!(bridge.query_for(&track, BridgeProtocol::Secondary), "Artist - Song");
        assert_eq!(
            bridge.query_for(&track, BridgeProtocol::Primary),
            "Artist - Song (official audio)"
        );

        let bridge = bridge.with_query_builder(Arc::new(|t: &Track, p: BridgeProtocol| format!("{} [{p}]", t.title)));
        assert_eq!(bridge.query_for(&track, BridgeProtocol::Primary), "Song [primary]");
    }

    #[tokio::test]
    async fn own_tracks_stream_directly() {
        let (source, _, bridge) = engine(playable(MockSource::new(), "abc123"));
        let mut track = build_track(&video("abc123", "Song", "Artist"), TrackOrigin::Primary, None);

        let stream = bridge.bridge(&mut track, Some(EXTRACTOR_IDENTIFIER)).await.unwrap();
        assert!(matches!(stream, Some(Streamable::Bytes(_))));
        assert!(track.bridge.is_none());
        assert!(!source.calls().iter().any(|c| c.starts_with("search")));
    }

    #[tokio::test]
    async fn secondary_match_is_attached() {
        let source = playable(MockSource::new(), "music01")
            .with_songs("Artist - Song", vec![song(Some("music01"), "Song")]);
        let (source, _, bridge) = engine(source);
        let bridge = bridge.with_setting(Some(BridgeSetting::Fixed(BridgeProtocol::Secondary)));
        let mut track = spotify_track();

        let stream = bridge.bridge(&mut track, Some("spotify")).await.unwrap();
        assert!(stream.is_some());
        let attached = track.bridge.as_ref().unwrap();
        assert_eq!(attached.url, "https://youtube.com/watch?v=music01&dpymeta=ytmusic");
        assert!(!source.calls().iter().any(|c| c.starts_with("search:")));
    }

    #[tokio::test]
    async fn soft_miss_falls_back_to_search() {
        let source = playable(MockSource::new(), "yt00001")
            .with_songs("Artist - Song", vec![song(None, "Song")])
            .with_search("Artist - Song", vec![SearchItem::Video(video("yt00001", "Song", "Artist"))]);
        let (source, _, bridge) = engine(source);
        let bridge = bridge.with_setting(Some(BridgeSetting::Fixed(BridgeProtocol::Secondary)));
        let mut track = spotify_track();

        assert!(bridge.bridge(&mut track, None).await.unwrap().is_some());
        assert_eq!(track.bridge.unwrap().url, "https://youtube.com/watch?v=yt00001");

        let calls = source.calls();
        let music = calls.iter().position(|c| c == "search_songs:Artist - Song").unwrap();
        let search = calls.iter().position(|c| c == "search:Artist - Song").unwrap();
        assert!(music < search);
    }

    #[tokio::test]
    async fn hard_failure_falls_back_to_search() {
        let source = playable(MockSource::new(), "yt00002")
            .failing_songs()
            .with_search("Artist - Song", vec![SearchItem::Video(video("yt00002", "Song", "Artist"))]);
        let (_, _, bridge) = engine(source);
        let bridge = bridge.with_setting(Some(BridgeSetting::Fixed(BridgeProtocol::Secondary)));
        let mut track = spotify_track();

        assert!(bridge.bridge(&mut track, None).await.unwrap().is_some());
        assert_eq!(track.bridge.unwrap().url, "https://youtube.com/watch?v=yt00002");
    }

    #[tokio::test]
    async fn unstreamable_music_match_falls_back_to_search() {
        // music01 matches the song search but has no info to stream from
        let source = playable(MockSource::new(), "yt00009")
            .with_songs("Artist - Song", vec![song(Some("music01"), "Song")])
            .with_search("Artist - Song", vec![SearchItem::Video(video("yt00009", "Song", "Artist"))]);
        let (source, _, bridge) = engine(source);
        let bridge = bridge.with_setting(Some(BridgeSetting::Fixed(BridgeProtocol::Secondary)));
        let mut track = spotify_track();

        let stream = bridge.bridge(&mut track, Some("spotify")).await.unwrap();
        assert!(matches!(stream, Some(Streamable::Bytes(_))));
        assert_eq!(track.bridge.unwrap().url, "https://youtube.com/watch?v=yt00009");

        let calls = source.calls();
        assert!(calls.contains(&"basic_info:music01:android".to_string()));
        assert!(calls.contains(&"search:Artist - Song".to_string()));
        assert!(calls.contains(&"download:yt00009:android".to_string()));
    }

    #[tokio::test]
    async fn failed_search_match_is_not_attached() {
        // found in search, but basic_info has nothing for it
        let source = MockSource::new().with_search(
            "Artist - Song (official audio)",
            vec![SearchItem::Video(video("yt00010", "Song", "Artist"))],
        );
        let (_, _, bridge) = engine(source);
        let mut track = spotify_track();

        assert!(bridge.bridge(&mut track, None).await.is_err());
        assert!(track.bridge.is_none());
    }

    #[tokio::test]
    async fn primary_protocol_searches_official_audio() {
        let source = playable(MockSource::new(), "yt00003").with_search(
            "Artist - Song (official audio)",
            vec![SearchItem::Video(video("yt00003", "Song", "Artist"))],
        );
        let (source, _, bridge) = engine(source);
        let mut track = spotify_track();

        assert!(bridge.bridge(&mut track, None).await.unwrap().is_some());
        assert!(!source.calls().iter().any(|c| c.starts_with("search_songs")));
    }

    #[tokio::test]
    async fn exhausted_bridge_is_none() {
        let (_, _, bridge) = engine(MockSource::new());
        let bridge = bridge.with_setting(Some(BridgeSetting::Fixed(BridgeProtocol::Secondary)));
        let mut track = spotify_track();
        assert!(bridge.bridge(&mut track, None).await.unwrap().is_none());
        assert!(track.bridge.is_none());
    }
}
