//! InnerTube: the JSON API behind the YouTube and YouTube Music web apps.
//!
//! One [`InnerTube`] value serves as both the [`PrimarySource`] (youtube.com)
//! and the [`SecondarySource`] (music.youtube.com). Every request is a POST of
//! a JSON body carrying a `context.client` block that names the first-party
//! client being impersonated; see [`ClientVariant`].

pub mod download;
pub mod parse;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::fetch::{FetchRequest, Fetcher};
use crate::session::{Credentials, Session};
use crate::source::{
    ChunkStream, ClientVariant, DownloadOptions, MixListing, PlaylistPage, PrimarySource,
    SearchItem, SecondarySource, SongRecord, VideoInfo, VideoRecord,
};

pub use download::CHUNK_SIZE;

const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";
const MUSIC_ORIGIN: &str = "https://music.youtube.com";

/// `search` params restricting YouTube Music results to songs.
const MUSIC_SONGS_PARAMS: &str = "EgWKAQIIAWoMEA4QChADEAQQCRAF";

/// The InnerTube API client.
pub struct InnerTube {
    fetcher: Arc<dyn Fetcher>,
    session: Arc<Session>,
    language: String,
    region: String,
    chunk_size: u64,
}

impl InnerTube {
    pub fn new(fetcher: Arc<dyn Fetcher>, session: Arc<Session>) -> Self {
        Self {
            fetcher,
            session,
            language: "en".to_string(),
            region: "US".to_string(),
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Set the `hl` / `gl` locale sent with every request.
    #[must_use]
    pub fn with_locale(mut self, language: impl Into<String>, region: impl Into<String>) -> Self {
        self.language = language.into();
        self.region = region.into();
        self
    }

    /// Size of one ranged download request.
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    fn context(&self, client: ClientVariant) -> Value {
        let profile = client.profile();
        let mut client_block = json!({
            "clientName": profile.name,
            "clientVersion": profile.version,
            "hl": self.language,
            "gl": self.region,
        });
        if let Some(sdk) = profile.android_sdk_version {
            client_block["androidSdkVersion"] = json!(sdk);
        }
        json!({ "client": client_block })
    }

    fn request(
        &self,
        origin: &str,
        endpoint: &str,
        client: ClientVariant,
        mut body: Value,
        credentials: Option<&Credentials>,
    ) -> FetchRequest {
        body["context"] = self.context(client);
        let profile = client.profile();

        let mut request =
            FetchRequest::post_json(format!("{origin}/youtubei/v1/{endpoint}?prettyPrint=false"), &body)
                .header("User-Agent", profile.user_agent)
                .header("X-Youtube-Client-Name", profile.name_id.to_string())
                .header("X-Youtube-Client-Version", profile.version)
                .header("Origin", origin);

        if let Some(creds) = credentials {
            if let Some(cookie) = creds.cookie.as_deref().filter(|c| !c.is_empty()) {
                request = request.header("Cookie", cookie).header("X-Origin", origin);
            }
            if let Some(token) = creds.access_token.as_deref().filter(|t| !t.is_empty()) {
                request = request.header("Authorization", format!("Bearer {token}"));
            }
        }
        request
    }

    async fn call_as(
        &self,
        origin: &str,
        endpoint: &str,
        client: ClientVariant,
        body: Value,
        credentials: Option<&Credentials>,
    ) -> Result<Value> {
        let request = self.request(origin, endpoint, client, body, credentials);
        let response = self
            .fetcher
            .fetch(request)
            .await
            .with_context(|| format!("InnerTube {endpoint} request failed"))?
            .error_for_status()
            .with_context(|| format!("InnerTube {endpoint} rejected"))?;

        debug!(endpoint, client = %client, bytes = response.body.len(), "InnerTube response");
        response
            .json()
            .with_context(|| format!("InnerTube {endpoint} returned invalid JSON"))
    }

    /// Call with the session's current credentials.
    async fn call(&self, origin: &str, endpoint: &str, client: ClientVariant, body: Value) -> Result<Value> {
        let credentials = self.session.credentials().await;
        self.call_as(origin, endpoint, client, body, credentials.as_ref()).await
    }

    async fn player(&self, video_id: &str, client: ClientVariant) -> Result<Value> {
        self.call(
            YOUTUBE_ORIGIN,
            "player",
            client,
            json!({ "videoId": video_id, "contentCheckOk": true, "racyCheckOk": true }),
        )
        .await
    }
}

#[async_trait]
impl PrimarySource for InnerTube {
    fn name(&self) -> &'static str {
        "youtube"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>> {
        let root = self
            .call(YOUTUBE_ORIGIN, "search", ClientVariant::Web, json!({ "query": query }))
            .await?;
        let items = parse::search_results(&root);
        debug!(results = items.len(), "Search parsed");
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn basic_info(&self, video_id: &str, client: ClientVariant) -> Result<VideoInfo> {
        let root = self.player(video_id, client).await?;
        parse::video_info(&root).with_context(|| format!("no playable info for {video_id}"))
    }

    #[instrument(skip(self))]
    async fn playlist(&self, list_id: &str) -> Result<PlaylistPage> {
        let root = self
            .call(
                YOUTUBE_ORIGIN,
                "browse",
                ClientVariant::Web,
                json!({ "browseId": format!("VL{list_id}") }),
            )
            .await?;
        if root.pointer("/alerts").is_some() && parse::find_key(&root, "playlistVideoRenderer").is_none() {
            let reason = parse::find_key(&root, "alertRenderer")
                .and_then(|a| parse::text(a.get("text")))
                .unwrap_or_else(|| "playlist unavailable".to_string());
            bail!("playlist {list_id}: {reason}");
        }
        Ok(parse::playlist_page(&root))
    }

    #[instrument(skip(self, token))]
    async fn playlist_continuation(&self, token: &str) -> Result<PlaylistPage> {
        let root = self
            .call(YOUTUBE_ORIGIN, "browse", ClientVariant::Web, json!({ "continuation": token }))
            .await?;
        Ok(parse::playlist_page(&root))
    }

    #[instrument(skip(self, info, options), fields(video_id = %info.record.id, client = %options.client))]
    async fn download(&self, info: &VideoInfo, options: DownloadOptions) -> Result<ChunkStream> {
        let formats = if info.streaming_data.is_null() {
            debug!("No playback data from lookup, requesting player");
            let root = self.player(&info.record.id, options.client).await?;
            download::formats(root.get("streamingData").unwrap_or(&Value::Null))
        } else {
            download::formats(&info.streaming_data)
        };
        let format = download::choose_format(&formats, options).with_context(|| {
            format!(
                "no {:?}/{:?} format with a direct URL among {} formats",
                options.kind,
                options.container,
                formats.len()
            )
        })?;
        let Some(url) = format.url.clone() else {
            bail!("format {} has no direct URL", format.itag);
        };

        info!(
            itag = format.itag,
            mime = %format.mime_type,
            bitrate = format.bitrate,
            length = ?format.content_length(),
            "Downloading"
        );
        Ok(download::chunk_stream(
            Arc::clone(&self.fetcher),
            url,
            format.content_length(),
            self.chunk_size,
        ))
    }

    #[instrument(skip(self))]
    async fn related(&self, video_id: &str) -> Result<Vec<VideoRecord>> {
        let root = self
            .call(YOUTUBE_ORIGIN, "next", ClientVariant::Web, json!({ "videoId": video_id }))
            .await?;
        Ok(parse::related_videos(&root))
    }

    async fn verify_credentials(&self, credentials: &Credentials) -> Result<()> {
        let root = self
            .call_as(
                YOUTUBE_ORIGIN,
                "account/account_menu",
                ClientVariant::Web,
                json!({}),
                Some(credentials),
            )
            .await?;
        if !parse::is_signed_in(&root) {
            bail!("credentials were not accepted: no active account");
        }
        Ok(())
    }
}

#[async_trait]
impl SecondarySource for InnerTube {
    fn name(&self) -> &'static str {
        "youtube-music"
    }

    #[instrument(skip(self))]
    async fn search_songs(&self, query: &str) -> Result<Vec<SongRecord>> {
        let root = self
            .call(
                MUSIC_ORIGIN,
                "search",
                ClientVariant::WebRemix,
                json!({ "query": query, "params": MUSIC_SONGS_PARAMS }),
            )
            .await?;
        Ok(parse::music_songs(&root))
    }

    #[instrument(skip(self))]
    async fn up_next(&self, video_id: &str, list_id: &str) -> Result<MixListing> {
        let root = self
            .call(
                MUSIC_ORIGIN,
                "next",
                ClientVariant::WebRemix,
                json!({ "videoId": video_id, "playlistId": list_id, "isAudioOnly": true }),
            )
            .await?;
        Ok(parse::music_up_next(&root))
    }
}
