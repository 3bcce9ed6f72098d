//! Turn a [`Track`] into something a player can consume.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use super::context::StreamingContext;
use crate::error::{Error, Result};
use crate::link;
use crate::source::{ChunkStream, Container, DownloadOptions, MediaKind, PrimarySource, Quality};
use crate::track::Track;

/// Playable media.
#[derive(Debug)]
pub enum Streamable {
    /// HLS manifest of a live stream. The player fetches it itself.
    Manifest(String),
    /// Downloaded media, read as it arrives.
    Bytes(MediaReader),
}

impl Streamable {
    pub fn manifest_url(&self) -> Option<&str> {
        match self {
            Self::Manifest(url) => Some(url),
            Self::Bytes(_) => None,
        }
    }

    pub fn into_reader(self) -> Option<MediaReader> {
        match self {
            Self::Bytes(reader) => Some(reader),
            Self::Manifest(_) => None,
        }
    }
}

/// Read half of a download pipe.
///
/// Bytes arrive in download order. When the download fails partway, the read
/// that would have hit end of stream fails with [`io::ErrorKind::UnexpectedEof`]
/// instead, so a truncated track never looks complete.
#[derive(Debug)]
pub struct MediaReader {
    inner: DuplexStream,
    failure: oneshot::Receiver<String>,
}

impl AsyncRead for MediaReader {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        // The failure is sent before the writer closes, so it is visible here.
        if buf.filled().len() == before && buf.remaining() > 0 {
            if let Ok(reason) = this.failure.try_recv() {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::UnexpectedEof, reason)));
            }
        }
        Poll::Ready(Ok(()))
    }
}

/// How a chunk pump ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Every chunk was written.
    Completed { bytes: u64 },
    /// The reader went away first.
    Cancelled { bytes: u64 },
    /// Upstream failed mid-download.
    Failed { bytes: u64, error: String },
}

/// Acquire a stream for `track` using the current [`StreamingContext`].
///
/// Live content that is family safe and exposes a manifest becomes
/// [`Streamable::Manifest`]. Live content that is not family safe is refused
/// with [`Error::RestrictedLiveStream`]. Everything else is downloaded as
/// best-quality MP4 audio and pumped into a pipe sized by the context's high
/// water mark.
#[instrument(skip(source, track), fields(url = %track.url))]
pub async fn acquire_stream(source: &dyn PrimarySource, track: &Track) -> Result<Streamable> {
    let ctx = StreamingContext::current();
    let video_id = link::extract_video_id(&track.url)
        .ok_or_else(|| Error::InvalidQuery(format!("no video id in {}", track.url)))?;

    let info = source.basic_info(&video_id, ctx.client).await?;

    if info.record.is_live {
        if !info.is_family_safe {
            return Err(Error::RestrictedLiveStream(video_id));
        }
        if let Some(manifest) = info.hls_manifest_url {
            info!(video_id = %video_id, "Live stream, returning manifest");
            return Ok(Streamable::Manifest(manifest));
        }
        debug!(video_id = %video_id, client = %ctx.client, "Live stream without manifest, downloading");
    }

    let options = DownloadOptions {
        quality: Quality::Best,
        kind: MediaKind::AudioOnly,
        container: Container::Mp4,
        client: ctx.client,
    };
    let chunks = source.download(&info, options).await?;

    Ok(Streamable::Bytes(spawn_pump(chunks, ctx.high_water_mark(), video_id)))
}

/// Pump `chunks` into a pipe of `capacity` bytes from a background task.
fn spawn_pump(chunks: ChunkStream, capacity: usize, video_id: String) -> MediaReader {
    let (mut writer, inner) = tokio::io::duplex(capacity);
    let (failed, failure) = oneshot::channel();

    tokio::spawn(async move {
        if let PumpOutcome::Failed { error, .. } = pump(chunks, &mut writer, &video_id).await {
            let _ = failed.send(error);
        }
        let _ = writer.shutdown().await;
    });

    MediaReader { inner, failure }
}

/// Write `chunks` to `writer` in order until the stream ends, the reader
/// disappears, or upstream fails. Closing the writer is left to the caller.
pub async fn pump<W>(mut chunks: ChunkStream, mut writer: W, video_id: &str) -> PumpOutcome
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = 0u64;

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(chunk) => {
                if writer.write_all(&chunk).await.is_err() {
                    debug!(video_id, bytes, "Reader dropped, stopping download");
                    return PumpOutcome::Cancelled { bytes };
                }
                bytes += chunk.len() as u64;
            }
            Err(e) => {
                let error = format!("{e:#}");
                warn!(video_id, bytes, error = %error, "Download failed");
                return PumpOutcome::Failed { bytes, error };
            }
        }
    }

    debug!(video_id, bytes, "Download complete");
    PumpOutcome::Completed { bytes }
}
