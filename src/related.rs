//! Autoplay: pick the next track related to the one that just played.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::link;
use crate::source::PrimarySource;
use crate::track::{build_track, Track, TrackOrigin};

/// Playback history supplied by the host queue. Read only.
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Who asked for the track that just played.
    pub requested_by: Option<String>,
    /// URLs already played in this session.
    pub played: HashSet<String>,
}

impl History {
    pub fn new(requested_by: Option<String>) -> Self {
        Self {
            requested_by,
            played: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_played(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.played.extend(urls);
        self
    }

    /// Returns `true` if a URL naming the same video was already played.
    pub fn has_played(&self, url: &str) -> bool {
        self.played.iter().any(|played| link::same_video(played, url))
    }
}

/// The first video related to `track` that is not in `history`.
#[instrument(skip(source, track, history), fields(url = %track.url))]
pub async fn related(source: &dyn PrimarySource, track: &Track, history: &History) -> Result<Option<Track>> {
    let id = track
        .video_id()
        .ok_or_else(|| Error::InvalidQuery(format!("no video id in {}", track.url)))?;

    let candidates = source.related(&id).await?;
    let total = candidates.len();

    let next = candidates
        .iter()
        .filter(|record| record.id != id)
        .map(|record| build_track(record, TrackOrigin::Primary, None))
        .find(|candidate| !history.has_played(&candidate.url));

    debug!(
        total,
        found = next.is_some(),
        requested_by = history.requested_by.as_deref().unwrap_or("-"),
        "Related lookup"
    );
    Ok(next)
}
