//! Error type shared by the resolution, bridging and streaming paths.

use thiserror::Error;

/// Errors surfaced by the public `tubelink` API.
///
/// Upstream sources report failures as [`anyhow::Error`] so they can carry
/// request context; those are wrapped in [`Error::Upstream`] at the boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no usable content found for {0}")]
    NotFound(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("live stream {0} is not family safe and cannot be streamed without a session")]
    RestrictedLiveStream(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("upstream error: {0:#}")]
    Upstream(#[from] anyhow::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
