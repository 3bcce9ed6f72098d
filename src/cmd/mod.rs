pub mod output;
pub mod related;
pub mod resolve;
pub mod stream;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use tubelink::{Config, Credentials, Query, QueryType, Track, YoutubeExtractor};

/// Build the extractor from the config file and sign in if a cookie was given.
pub async fn build_extractor(config_path: Option<&Path>, cookie: Option<String>) -> Result<YoutubeExtractor> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let extractor = YoutubeExtractor::from_config(&config)?;

    if let Some(cookie) = cookie {
        let credentials = Credentials {
            cookie: Some(cookie),
            access_token: None,
        };
        if !extractor.sign_in(credentials, true).await? {
            warn!("Cookie rejected, continuing signed out");
        }
    }

    Ok(extractor)
}

/// Resolve `url` as a single video.
pub async fn resolve_video(extractor: &YoutubeExtractor, url: &str) -> Result<Track> {
    extractor
        .resolve(&Query::new(url, QueryType::Video))
        .await
        .tracks
        .into_iter()
        .next()
        .with_context(|| format!("No video found for {url}"))
}
