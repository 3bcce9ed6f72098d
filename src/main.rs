//! `tubelink` CLI - resolve, bridge and stream YouTube media

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tubelink::{ClientVariant, QueryType};

#[derive(Parser)]
#[command(name = "tubelink")]
#[command(about = "Resolve YouTube queries and stream their audio")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/tubelink/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Browser session cookie used to sign in
    #[arg(long, global = true)]
    cookie: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a link, list id or search text into tracks
    Resolve {
        /// URL, video id or search text
        query: String,

        /// How to interpret the query (video, playlist, search, auto, raw)
        #[arg(short = 't', long = "type")]
        kind: Option<QueryType>,
    },

    /// Stream a video's audio to a file or stdout
    Stream {
        /// Video URL or id
        url: String,

        /// Client variant to request formats as
        #[arg(short, long)]
        client: Option<ClientVariant>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find a YouTube match for a track from another service and stream it
    Bridge {
        /// Track title
        #[arg(long)]
        title: String,

        /// Track artist
        #[arg(long)]
        author: String,

        /// Query kind of the originating service, e.g. spotifySong
        #[arg(long, default_value = "search")]
        kind: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the next autoplay track for a video
    Related {
        /// Video URL or id
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries stream bytes
    let filter = EnvFilter::try_from_env("TUBELINK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let extractor = cmd::build_extractor(cli.config.as_deref(), cli.cookie).await?;

    match cli.command {
        Commands::Resolve { query, kind } => {
            cmd::resolve::cmd_resolve(&extractor, &query, kind, cli.format).await?;
        }
        Commands::Stream { url, client, output } => {
            cmd::stream::cmd_stream(&extractor, &url, client, output).await?;
        }
        Commands::Bridge { title, author, kind, output } => {
            cmd::stream::cmd_bridge(&extractor, &title, &author, &kind, output, cli.format).await?;
        }
        Commands::Related { url } => {
            cmd::related::cmd_related(&extractor, &url, cli.format).await?;
        }
    }

    Ok(())
}
