use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{stdout, AsyncWrite, AsyncWriteExt};

use tubelink::{ClientVariant, MediaReader, Streamable, StreamingContext, Track, YoutubeExtractor};

use super::output::print_track;
use super::resolve_video;
use crate::OutputFormat;

pub async fn cmd_stream(
    extractor: &YoutubeExtractor,
    url: &str,
    client: Option<ClientVariant>,
    output: Option<PathBuf>,
) -> Result<()> {
    let track = resolve_video(extractor, url).await?;
    eprintln!("🎵 {} - {} [{}]", track.author, track.title, track.duration_text);

    let streamable = match client {
        Some(client) => {
            StreamingContext::new(client)
                .scope(extractor.stream(&track))
                .await?
        }
        None => extractor.stream(&track).await?,
    };

    write_streamable(streamable, output).await
}

pub async fn cmd_bridge(
    extractor: &YoutubeExtractor,
    title: &str,
    author: &str,
    kind: &str,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut track = Track::foreign(title, author, "", 0, "cli", kind);

    let Some(streamable) = extractor.bridge(&mut track, None).await? else {
        anyhow::bail!("No YouTube match for {author} - {title}");
    };
    if let Some(matched) = &track.bridge {
        eprintln!("🔗 Matched on {}:", matched.source);
        print_track(matched, format);
    }

    write_streamable(streamable, output).await
}

async fn write_streamable(streamable: Streamable, output: Option<PathBuf>) -> Result<()> {
    let mut reader = match streamable {
        Streamable::Manifest(url) => {
            eprintln!("📡 Live stream manifest:");
            println!("{url}");
            return Ok(());
        }
        Streamable::Bytes(reader) => reader,
    };

    let (written, target) = match output {
        Some(path) => {
            let mut file = tokio::fs::File::create(&path).await?;
            (copy_all(&mut reader, &mut file).await?, path.display().to_string())
        }
        None => (copy_all(&mut reader, &mut stdout()).await?, "stdout".to_string()),
    };

    eprintln!("💾 Wrote {} to {target}", format_bytes(written));
    Ok(())
}

async fn copy_all<W: AsyncWrite + Unpin>(reader: &mut MediaReader, writer: &mut W) -> Result<u64> {
    let written = tokio::io::copy(reader, writer)
        .await
        .context("Download interrupted")?;
    writer.flush().await?;
    Ok(written)
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    match bytes {
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}
