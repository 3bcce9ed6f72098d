use anyhow::Result;

use tubelink::{History, YoutubeExtractor};

use super::output::print_track;
use super::resolve_video;
use crate::OutputFormat;

pub async fn cmd_related(extractor: &YoutubeExtractor, url: &str, format: OutputFormat) -> Result<()> {
    let seed = resolve_video(extractor, url).await?;
    let history = History::default().with_played([seed.url.clone()]);

    match extractor.related(&seed, &history).await? {
        Some(next) => print_track(&next, format),
        None => eprintln!("No related video found for {}", seed.url),
    }
    Ok(())
}
