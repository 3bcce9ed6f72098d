//! Playlist resolution.
//!
//! Regular playlists are listed through the primary source and drained page
//! by page before anything is returned. Mixes (a link naming both a video and
//! a list) are listed through the music source's up-next queue, which keeps
//! the mix order and metadata the primary listing does not expose.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::link;
use crate::source::{ChannelMeta, PlaylistHeader, PlaylistItem, PrimarySource, SecondarySource, VideoRecord};
use crate::track::{
    best_thumbnail, Playlist, PlaylistAuthor, PlaylistKind, PlaylistMeta, TrackOrigin, UNKNOWN,
    UNKNOWN_PLAYLIST,
};

/// Upper bound on pages fetched for one playlist.
pub const DEFAULT_MAX_PAGES: usize = 200;

/// Resolves playlists and mixes into fully built [`Playlist`]s.
pub struct PlaylistResolver {
    primary: Arc<dyn PrimarySource>,
    secondary: Arc<dyn SecondarySource>,
    max_pages: usize,
}

impl PlaylistResolver {
    pub fn new(primary: Arc<dyn PrimarySource>, secondary: Arc<dyn SecondarySource>) -> Self {
        Self {
            primary,
            secondary,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// List every page of `list_id`.
    ///
    /// Deleted and private entries are skipped. Stops early, with a warning,
    /// when the page ceiling is reached or upstream repeats a continuation
    /// token; the videos gathered up to that point are kept.
    #[instrument(skip(self))]
    pub async fn resolve(&self, list_id: &str) -> Result<Arc<Playlist>> {
        let first = self.primary.playlist(list_id).await?;
        let mut records = Vec::new();
        let mut skipped = collect_videos(first.items, &mut records);

        let mut pages = 1;
        let mut seen_tokens = HashSet::new();
        let mut next = first.continuation;

        while let Some(token) = next.take() {
            if pages >= self.max_pages {
                warn!(
                    list_id,
                    pages,
                    tracks = records.len(),
                    "Playlist page limit reached, returning tracks gathered so far"
                );
                break;
            }
            if !seen_tokens.insert(token.clone()) {
                warn!(list_id, pages, "Upstream repeated a continuation token, stopping");
                break;
            }

            let page = self.primary.playlist_continuation(&token).await?;
            pages += 1;
            skipped += collect_videos(page.items, &mut records);
            next = page.continuation;
        }

        if skipped > 0 {
            debug!(list_id, skipped, "Skipped unavailable playlist entries");
        }
        info!(list_id, pages, tracks = records.len(), "Playlist resolved");

        let meta = playlist_meta(list_id, &first.header, first.channel.as_ref(), &records);
        Ok(Playlist::assemble(meta, &records, TrackOrigin::Primary))
    }

    /// List the mix seeded by `video_id` within `list_id`.
    #[instrument(skip(self))]
    pub async fn resolve_mix(&self, video_id: &str, list_id: &str) -> Result<Arc<Playlist>> {
        let mix = self.secondary.up_next(video_id, list_id).await?;
        info!(list_id, tracks = mix.items.len(), "Mix resolved");

        let meta = PlaylistMeta {
            id: list_id.to_string(),
            title: mix
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_PLAYLIST.to_string()),
            description: String::new(),
            thumbnail_url: first_thumbnail(&mix.items),
            author: PlaylistAuthor {
                name: UNKNOWN.to_string(),
                url: String::new(),
            },
            kind: PlaylistKind::Mix,
            url: link::playlist_url(list_id),
        };
        Ok(Playlist::assemble(meta, &mix.items, TrackOrigin::Music))
    }
}

/// Append playable videos to `out`, returning how many entries were skipped.
fn collect_videos(items: Vec<PlaylistItem>, out: &mut Vec<VideoRecord>) -> usize {
    let mut skipped = 0;
    for item in items {
        match item {
            PlaylistItem::Video(record) => out.push(record),
            PlaylistItem::Unavailable { .. } => skipped += 1,
        }
    }
    skipped
}

fn first_thumbnail(records: &[VideoRecord]) -> String {
    records
        .first()
        .and_then(|r| best_thumbnail(&r.thumbnails))
        .map(|t| t.url.clone())
        .unwrap_or_default()
}

fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

fn playlist_meta(
    list_id: &str,
    header: &PlaylistHeader,
    channel: Option<&ChannelMeta>,
    records: &[VideoRecord],
) -> PlaylistMeta {
    let author_name = present(header.author_name.as_ref())
        .or_else(|| present(channel.and_then(|c| c.name.as_ref())))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let author_url = present(header.author_url.as_ref())
        .or_else(|| present(channel.and_then(|c| c.url.as_ref())))
        .unwrap_or_default();

    PlaylistMeta {
        id: list_id.to_string(),
        title: present(header.title.as_ref()).unwrap_or_else(|| UNKNOWN_PLAYLIST.to_string()),
        description: header.description.clone().unwrap_or_default(),
        thumbnail_url: present(header.thumbnail_url.as_ref()).unwrap_or_else(|| first_thumbnail(records)),
        author: PlaylistAuthor {
            name: author_name,
            url: author_url,
        },
        kind: PlaylistKind::Playlist,
        url: link::playlist_url(list_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::source::mock::{video, MockSource};
    use crate::source::{MixListing, PlaylistPage, Thumbnail};

    fn page(ids: &[&str], continuation: Option<&str>) -> PlaylistPage {
        PlaylistPage {
            items: ids
                .iter()
                .map(|id| PlaylistItem::Video(video(id, &format!("Song {id}"), "Artist")))
                .collect(),
            continuation: continuation.map(String::from),
            ..PlaylistPage::default()
        }
    }

    fn setup(source: MockSource) -> (Arc<MockSource>, PlaylistResolver) {
        let source = Arc::new(source);
        let resolver = PlaylistResolver::new(source.clone(), source.clone());
        (source, resolver)
    }

    fn ids(playlist: &Playlist) -> Vec<String> {
        playlist.tracks.iter().filter_map(crate::track::Track::video_id).collect()
    }

    #[tokio::test]
    async fn drains_all_pages_in_order() {
        let mut first = page(&["a1", "a2"], Some("t2"));
        first.items.insert(1, PlaylistItem::Unavailable { id: Some("gone".into()) });
        first.header.title = Some("Road Trip".into());

        let (source, resolver) = setup(
            MockSource::new()
                .with_page("PL1", first)
                .with_continuation("t2", page(&["b1"], Some("t3")))
                .with_continuation("t3", page(&["c1", "c2"], None)),
        );

        let playlist = resolver.resolve("PL1").await.unwrap();
        assert_eq!(ids(&playlist), vec!["a1", "a2", "b1", "c1", "c2"]);
        assert_eq!(playlist.title, "Road Trip");
        assert_eq!(playlist.url, "https://www.youtube.com/playlist?list=PL1");
        assert_eq!(
            source.calls(),
            vec!["playlist:PL1", "continuation:t2", "continuation:t3"]
        );
        assert!(playlist
            .tracks
            .iter()
            .all(|t| t.owning_playlist().is_some_and(|p| Arc::ptr_eq(&p, &playlist))));
    }

    #[tokio::test]
    async fn resolving_twice_gives_same_tracks() {
        let (source, resolver) = setup(
            MockSource::new()
                .with_page("PL1", page(&["a1", "a2"], Some("t2")))
                .with_continuation("t2", page(&["b1", "b2"], Some("t3")))
                .with_continuation("t3", page(&["c1"], None)),
        );

        let first = resolver.resolve("PL1").await.unwrap();
        let second = resolver.resolve("PL1").await.unwrap();
        assert_eq!(ids(&first), vec!["a1", "a2", "b1", "b2", "c1"]);
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(source.calls().len(), 6);
    }

    #[tokio::test]
    async fn page_ceiling_returns_gathered_tracks() {
        let (source, resolver) = setup(
            MockSource::new()
                .with_page("PL1", page(&["a"], Some("t2")))
                .with_continuation("t2", page(&["b"], Some("t3")))
                .with_continuation("t3", page(&["c"], Some("t4"))),
        );
        let resolver = resolver.with_max_pages(2);

        let playlist = resolver.resolve("PL1").await.unwrap();
        assert_eq!(ids(&playlist), vec!["a", "b"]);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn repeated_token_stops_pagination() {
        let (_, resolver) = setup(
            MockSource::new()
                .with_page("PL1", page(&["a"], Some("loop")))
                .with_continuation("loop", page(&["b"], Some("loop"))),
        );
        let playlist = resolver.resolve("PL1").await.unwrap();
        assert_eq!(ids(&playlist), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failing_continuation_fails_whole_resolution() {
        let (_, resolver) = setup(MockSource::new().with_page("PL1", page(&["a"], Some("expired"))));
        let err = resolver.resolve("PL1").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn metadata_falls_back_to_channel_then_sentinels() {
        let mut with_channel = page(&["a"], None);
        with_channel.channel = Some(ChannelMeta {
            name: Some("Channel".into()),
            url: Some("https://www.youtube.com/@channel".into()),
        });
        let (_, resolver) = setup(
            MockSource::new()
                .with_page("PL1", with_channel)
                .with_page("PL2", page(&[], None)),
        );

        let playlist = resolver.resolve("PL1").await.unwrap();
        assert_eq!(playlist.title, UNKNOWN_PLAYLIST);
        assert_eq!(playlist.author.name, "Channel");
        assert_eq!(playlist.author.url, "https://www.youtube.com/@channel");

        let bare = resolver.resolve("PL2").await.unwrap();
        assert_eq!(bare.author.name, UNKNOWN);
        assert_eq!(bare.author.url, "");
        assert_eq!(bare.thumbnail_url, "");
        assert!(bare.tracks.is_empty());
    }

    #[tokio::test]
    async fn thumbnail_falls_back_to_first_track() {
        let mut first = page(&["a"], None);
        if let PlaylistItem::Video(record) = &mut first.items[0] {
            record.thumbnails = vec![Thumbnail { url: "a.jpg".into(), width: 10, height: 10 }];
        }
        let (_, resolver) = setup(MockSource::new().with_page("PL1", first));
        assert_eq!(resolver.resolve("PL1").await.unwrap().thumbnail_url, "a.jpg");
    }

    #[tokio::test]
    async fn mix_keeps_music_order() {
        let mix = MixListing {
            title: Some("Mix - Artist".into()),
            items: vec![video("abc123", "Seed", "Artist"), video("def456", "Next", "Other")],
        };
        let (_, resolver) = setup(MockSource::new().with_mix("abc123", "RDabc123", mix));

        let playlist = resolver.resolve_mix("abc123", "RDabc123").await.unwrap();
        assert_eq!(playlist.kind, PlaylistKind::Mix);
        assert_eq!(playlist.title, "Mix - Artist");
        assert_eq!(ids(&playlist), vec!["abc123", "def456"]);
        assert!(playlist.tracks[0].url.contains("abc123"));
        assert!(playlist.tracks[0].url.ends_with(link::MUSIC_META_SUFFIX));
    }
}
