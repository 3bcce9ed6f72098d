//! The YouTube extractor facade.
//!
//! [`YoutubeExtractor`] wires the sources, session, resolver and bridge
//! together. Hosts hold it in an `Arc` and pass it where it is needed; there
//! is no process-wide instance.

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::bridge::{Bridge, BridgeQueryBuilder, BridgeSetting, EXTRACTOR_IDENTIFIER};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{Fetcher, RotatingFetcher};
use crate::http_client::ReqwestFetcher;
use crate::playlist::{PlaylistResolver, DEFAULT_MAX_PAGES};
use crate::related::{self, History};
use crate::resolver::{Query, QueryResolver, ResolutionResult};
use crate::session::{Credentials, Session};
use crate::source::innertube::InnerTube;
use crate::source::{PrimarySource, SecondarySource};
use crate::stream::{acquire_stream, Streamable, StreamingContext};
use crate::track::Track;

/// Resolution, bridging and streaming behind one handle.
pub struct YoutubeExtractor {
    primary: Arc<dyn PrimarySource>,
    session: Arc<Session>,
    resolver: Arc<QueryResolver>,
    bridge: Bridge,
    context: StreamingContext,
}

/// Assembles a [`YoutubeExtractor`] from explicit parts.
pub struct ExtractorBuilder {
    primary: Arc<dyn PrimarySource>,
    secondary: Arc<dyn SecondarySource>,
    session: Arc<Session>,
    max_playlist_pages: usize,
    bridge_setting: Option<BridgeSetting>,
    query_builder: Option<BridgeQueryBuilder>,
    context: StreamingContext,
}

impl ExtractorBuilder {
    pub fn new(
        primary: Arc<dyn PrimarySource>,
        secondary: Arc<dyn SecondarySource>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            primary,
            secondary,
            session,
            max_playlist_pages: DEFAULT_MAX_PAGES,
            bridge_setting: None,
            query_builder: None,
            context: StreamingContext::default(),
        }
    }

    #[must_use]
    pub fn max_playlist_pages(mut self, pages: usize) -> Self {
        self.max_playlist_pages = pages;
        self
    }

    #[must_use]
    pub fn bridge_setting(mut self, setting: Option<BridgeSetting>) -> Self {
        self.bridge_setting = setting;
        self
    }

    #[must_use]
    pub fn bridge_query_builder(mut self, builder: BridgeQueryBuilder) -> Self {
        self.query_builder = Some(builder);
        self
    }

    /// Context used by streaming calls made outside a caller-installed one.
    #[must_use]
    pub fn streaming_context(mut self, context: StreamingContext) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> YoutubeExtractor {
        let playlists = PlaylistResolver::new(Arc::clone(&self.primary), Arc::clone(&self.secondary))
            .with_max_pages(self.max_playlist_pages);
        let resolver = Arc::new(QueryResolver::new(Arc::clone(&self.primary), playlists));

        let mut bridge = Bridge::new(
            Arc::clone(&self.primary),
            self.secondary,
            Arc::clone(&resolver),
            Arc::clone(&self.session),
        )
        .with_setting(self.bridge_setting);
        if let Some(builder) = self.query_builder {
            bridge = bridge.with_query_builder(builder);
        }

        YoutubeExtractor {
            primary: self.primary,
            session: self.session,
            resolver,
            bridge,
            context: self.context,
        }
    }
}

impl YoutubeExtractor {
    pub fn builder(
        primary: Arc<dyn PrimarySource>,
        secondary: Arc<dyn SecondarySource>,
        session: Arc<Session>,
    ) -> ExtractorBuilder {
        ExtractorBuilder::new(primary, secondary, session)
    }

    /// Build the InnerTube-backed extractor described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let session = Arc::new(Session::new());
        let rotator = config.rotator()?;
        if let Some(block) = config.rotation.block.as_deref().filter(|_| rotator.is_some()) {
            info!(block, "IP rotation enabled");
        }

        let fetcher: Arc<dyn Fetcher> = Arc::new(RotatingFetcher::new(ReqwestFetcher::new()?, rotator));
        let tube = Arc::new(
            InnerTube::new(fetcher, Arc::clone(&session)).with_locale(&config.language, &config.region),
        );

        Ok(Self::builder(tube.clone(), tube, session)
            .max_playlist_pages(config.max_playlist_pages)
            .bridge_setting(config.bridge.protocol.clone())
            .streaming_context(config.streaming_context())
            .build())
    }

    /// Identity to pass to [`bridge`](Self::bridge) for tracks this
    /// extractor produced.
    pub fn identifier(&self) -> &'static str {
        EXTRACTOR_IDENTIFIER
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn resolver(&self) -> &QueryResolver {
        &self.resolver
    }

    /// Resolve a query. Never fails; see [`QueryResolver::resolve`].
    pub async fn resolve(&self, query: &Query) -> ResolutionResult {
        self.resolver.resolve(query).await
    }

    /// Acquire a stream for one of this extractor's tracks.
    pub async fn stream(&self, track: &Track) -> Result<Streamable> {
        self.in_context(acquire_stream(self.primary.as_ref(), track)).await
    }

    /// Stream a track from any extractor, bridging when needed.
    pub async fn bridge(&self, track: &mut Track, extractor: Option<&str>) -> Result<Option<Streamable>> {
        self.in_context(self.bridge.bridge(track, extractor)).await
    }

    /// The next autoplay track after `track`.
    pub async fn related(&self, track: &Track, history: &History) -> Result<Option<Track>> {
        related::related(self.primary.as_ref(), track, history).await
    }

    pub async fn sign_in(&self, credentials: Credentials, suppress_errors: bool) -> Result<bool> {
        self.session
            .sign_in(self.primary.as_ref(), credentials, suppress_errors)
            .await
    }

    pub async fn sign_out(&self) {
        self.session.sign_out().await;
    }

    /// Run `fut` in the caller's streaming context, or in the configured one
    /// when the caller did not install any.
    async fn in_context<F: Future>(&self, fut: F) -> F::Output {
        if StreamingContext::is_set() {
            fut.await
        } else {
            self.context.scope(fut).await
        }
    }
}
