//! Format selection and ranged chunk downloads.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::fetch::{FetchRequest, Fetcher};
use crate::source::{ChunkStream, DownloadOptions, MediaKind, Quality};

/// Default size of one ranged request.
pub const CHUNK_SIZE: u64 = 10 * 1024 * 1024;

const MAX_RETRIES: u32 = 3;

/// A streaming format from a `player` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    pub itag: u32,
    /// Direct URL. Absent for formats that need signature deciphering.
    pub url: Option<String>,
    pub mime_type: String,
    #[serde(default)]
    pub bitrate: u64,
    pub content_length: Option<String>,
    pub audio_quality: Option<String>,
}

impl Format {
    pub fn content_length(&self) -> Option<u64> {
        self.content_length.as_deref().and_then(|s| s.parse().ok())
    }

    fn fits(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::AudioOnly => self.mime_type.starts_with("audio/"),
            MediaKind::VideoAndAudio => {
                self.mime_type.starts_with("video/") && self.audio_quality.is_some()
            }
        }
    }
}

/// Every format in the `streamingData` block of a `player` response, muxed
/// and adaptive.
///
/// Entries that fail to deserialize are skipped.
pub fn formats(streaming_data: &Value) -> Vec<Format> {
    ["formats", "adaptiveFormats"]
        .iter()
        .filter_map(|key| streaming_data.get(key)?.as_array())
        .flatten()
        .filter_map(|f| Format::deserialize(f).ok())
        .collect()
}

/// Pick the format matching `options`, preferring direct URLs.
pub fn choose_format(formats: &[Format], options: DownloadOptions) -> Option<&Format> {
    let candidates = formats
        .iter()
        .filter(|f| f.url.is_some())
        .filter(|f| f.fits(options.kind))
        .filter(|f| options.container.matches_mime(&f.mime_type));

    match options.quality {
        Quality::Best => candidates.max_by_key(|f| f.bitrate),
        Quality::Lowest => candidates.min_by_key(|f| f.bitrate),
    }
}

struct Cursor {
    fetcher: Arc<dyn Fetcher>,
    url: String,
    offset: u64,
    total: Option<u64>,
    chunk_size: u64,
    done: bool,
}

/// Stream `url` in `chunk_size` ranges. Without a known length the whole
/// resource is fetched as a single chunk.
pub fn chunk_stream(
    fetcher: Arc<dyn Fetcher>,
    url: String,
    total: Option<u64>,
    chunk_size: u64,
) -> ChunkStream {
    let cursor = Cursor {
        fetcher,
        url,
        offset: 0,
        total,
        chunk_size: chunk_size.max(1),
        done: false,
    };

    futures::stream::try_unfold(cursor, |mut cursor| async move {
        if cursor.done {
            return Ok(None);
        }

        let Some(total) = cursor.total else {
            let body = fetch_with_retry(cursor.fetcher.as_ref(), FetchRequest::get(&cursor.url)).await?;
            cursor.done = true;
            return Ok(Some((body, cursor)));
        };

        if cursor.offset >= total {
            return Ok(None);
        }

        let end = (cursor.offset + cursor.chunk_size).min(total) - 1;
        let request =
            FetchRequest::get(&cursor.url).header("Range", format!("bytes={}-{end}", cursor.offset));
        let body = fetch_with_retry(cursor.fetcher.as_ref(), request).await?;
        if body.is_empty() {
            bail!("empty chunk at offset {} of {total}", cursor.offset);
        }

        debug!(offset = cursor.offset, bytes = body.len(), total, "Chunk received");
        cursor.offset += body.len() as u64;
        Ok::<_, anyhow::Error>(Some((body, cursor)))
    })
    .boxed()
}

async fn fetch_with_retry(fetcher: &dyn Fetcher, request: FetchRequest) -> Result<bytes::Bytes> {
    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        match fetcher.fetch(request.clone()).await {
            Ok(resp) if resp.is_success() => return Ok(resp.body),
            Ok(resp) => {
                last_error = Some(anyhow!("chunk fetch failed: HTTP {}", resp.status));
            }
            Err(e) => last_error = Some(e),
        }

        if attempt < MAX_RETRIES - 1 {
            tokio::time::sleep(Duration::from_millis(500 * (u64::from(attempt) + 1))).await;
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("unknown chunk fetch error")))
}
