//! In-memory sources for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use super::{
    ChunkStream, ClientVariant, DownloadOptions, MixListing, PlaylistPage, PrimarySource,
    SearchItem, SecondarySource, SongRecord, VideoInfo, VideoRecord,
};
use crate::session::Credentials;

pub fn video(id: &str, title: &str, author: &str) -> VideoRecord {
    VideoRecord {
        id: id.to_string(),
        title: Some(title.to_string()),
        author: Some(author.to_string()),
        duration_seconds: Some(200),
        ..VideoRecord::default()
    }
}

#[derive(Default)]
pub struct MockSource {
    search: HashMap<String, Vec<SearchItem>>,
    failing_search: bool,
    infos: HashMap<String, VideoInfo>,
    pages: HashMap<String, PlaylistPage>,
    continuations: HashMap<String, PlaylistPage>,
    media: HashMap<String, Vec<Result<Bytes, String>>>,
    related: HashMap<String, Vec<VideoRecord>>,
    songs: HashMap<String, Vec<SongRecord>>,
    failing_songs: bool,
    mixes: HashMap<(String, String), MixListing>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: &str, items: Vec<SearchItem>) -> Self {
        self.search.insert(query.to_string(), items);
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.failing_search = true;
        self
    }

    pub fn with_info(mut self, record: VideoRecord, family_safe: bool, manifest: Option<&str>) -> Self {
        self.infos.insert(
            record.id.clone(),
            VideoInfo {
                record,
                is_family_safe: family_safe,
                hls_manifest_url: manifest.map(String::from),
                streaming_data: serde_json::Value::Null,
            },
        );
        self
    }

    pub fn with_page(mut self, list_id: &str, page: PlaylistPage) -> Self {
        self.pages.insert(list_id.to_string(), page);
        self
    }

    pub fn with_continuation(mut self, token: &str, page: PlaylistPage) -> Self {
        self.continuations.insert(token.to_string(), page);
        self
    }

    pub fn with_media(mut self, video_id: &str, chunks: Vec<Result<Bytes, String>>) -> Self {
        self.media.insert(video_id.to_string(), chunks);
        self
    }

    pub fn with_related(mut self, video_id: &str, records: Vec<VideoRecord>) -> Self {
        self.related.insert(video_id.to_string(), records);
        self
    }

    pub fn with_songs(mut self, query: &str, songs: Vec<SongRecord>) -> Self {
        self.songs.insert(query.to_string(), songs);
        self
    }

    pub fn failing_songs(mut self) -> Self {
        self.failing_songs = true;
        self
    }

    pub fn with_mix(mut self, video_id: &str, list_id: &str, mix: MixListing) -> Self {
        self.mixes.insert((video_id.to_string(), list_id.to_string()), mix);
        self
    }

    /// Every call made so far, as `"<method>:<args>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PrimarySource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchItem>> {
        self.record(format!("search:{query}"));
        if self.failing_search {
            return Err(anyhow!("search backend down"));
        }
        Ok(self.search.get(query).cloned().unwrap_or_default())
    }

    async fn basic_info(&self, video_id: &str, client: ClientVariant) -> Result<VideoInfo> {
        self.record(format!("basic_info:{video_id}:{client}"));
        self.infos
            .get(video_id)
            .cloned()
            .ok_or_else(|| anyhow!("video {video_id} unavailable"))
    }

    async fn playlist(&self, list_id: &str) -> Result<PlaylistPage> {
        self.record(format!("playlist:{list_id}"));
        self.pages
            .get(list_id)
            .cloned()
            .ok_or_else(|| anyhow!("playlist {list_id} does not exist"))
    }

    async fn playlist_continuation(&self, token: &str) -> Result<PlaylistPage> {
        self.record(format!("continuation:{token}"));
        self.continuations
            .get(token)
            .cloned()
            .ok_or_else(|| anyhow!("continuation {token} expired"))
    }

    async fn download(&self, info: &VideoInfo, options: DownloadOptions) -> Result<ChunkStream> {
        let video_id = &info.record.id;
        self.record(format!("download:{video_id}:{}", options.client));
        let chunks = self
            .media
            .get(video_id)
            .cloned()
            .ok_or_else(|| anyhow!("no media for {video_id}"))?;
        Ok(futures::stream::iter(chunks.into_iter().map(|c| c.map_err(|e| anyhow!(e)))).boxed())
    }

    async fn related(&self, video_id: &str) -> Result<Vec<VideoRecord>> {
        self.record(format!("related:{video_id}"));
        Ok(self.related.get(video_id).cloned().unwrap_or_default())
    }

    async fn verify_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.record("verify_credentials".to_string());
        if credentials.cookie.as_deref() == Some("valid") {
            Ok(())
        } else {
            Err(anyhow!("credentials rejected"))
        }
    }
}

#[async_trait]
impl SecondarySource for MockSource {
    fn name(&self) -> &'static str {
        "mock-music"
    }

    async fn search_songs(&self, query: &str) -> Result<Vec<SongRecord>> {
        self.record(format!("search_songs:{query}"));
        if self.failing_songs {
            return Err(anyhow!("music catalog down"));
        }
        Ok(self.songs.get(query).cloned().unwrap_or_default())
    }

    async fn up_next(&self, video_id: &str, list_id: &str) -> Result<MixListing> {
        self.record(format!("up_next:{video_id}:{list_id}"));
        self.mixes
            .get(&(video_id.to_string(), list_id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("mix {list_id} unavailable"))
    }
}
