//! `tubelink` - YouTube resolution, bridging and streaming for music bots
//!
//! # Features
//!
//! - **Query resolution**: video links, playlists (all pages), mixes and
//!   free-text search, normalized into [`Track`]s and [`Playlist`]s
//! - **Bridging**: play tracks found by other extractors through YouTube Music
//!   or YouTube search
//! - **Streaming**: live manifests or chunked audio downloads exposed as one
//!   [`Streamable`], configured per call through a task-local
//!   [`StreamingContext`]
//! - **IP rotation**: spread outbound requests across an address block
//!
//! # Example
//!
//! ```rust,no_run
//! use tubelink::{Config, Query, YoutubeExtractor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let extractor = YoutubeExtractor::from_config(&Config::load()?)?;
//!     let result = extractor.resolve(&Query::detect("never gonna give you up")).await;
//!     for track in &result.tracks {
//!         println!("{} - {} ({})", track.author, track.title, track.duration_text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod http_client;
pub mod link;
pub mod playlist;
pub mod related;
pub mod resolver;
pub mod session;
pub mod source;
pub mod stream;
pub mod track;

pub use bridge::{Bridge, BridgeProtocol, BridgeQueryBuilder, BridgeSetting, SecondaryAttempt, EXTRACTOR_IDENTIFIER};
pub use config::Config;
pub use error::{Error, Result};
pub use extractor::{ExtractorBuilder, YoutubeExtractor};
pub use fetch::{CidrRotator, FetchRequest, FetchResponse, Fetcher, IpRotator, RotatingFetcher};
pub use http_client::ReqwestFetcher;
pub use playlist::PlaylistResolver;
pub use related::History;
pub use resolver::{Query, QueryResolver, QueryType, ResolutionResult};
pub use session::{Credentials, Session};
pub use source::innertube::InnerTube;
pub use source::{ClientVariant, PrimarySource, SecondarySource};
pub use stream::{acquire_stream, MediaReader, Streamable, StreamingContext};
pub use track::{Playlist, PlaylistAuthor, PlaylistKind, Track};

/// Version of tubelink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
