//! Configuration loaded from `~/.config/tubelink/config.toml`.
//!
//! Every key is optional:
//!
//! ```toml
//! client = "android"
//! high_water_mark = 524288
//! max_playlist_pages = 200
//! language = "en"
//! region = "US"
//!
//! [bridge]
//! protocol = "secondary"     # or { default = "primary", spotifySong = "secondary" }
//!
//! [rotation]
//! block = "2001:db8::/48"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::bridge::BridgeSetting;
use crate::error::{Error, Result};
use crate::fetch::{CidrRotator, IpRotator};
use crate::playlist::DEFAULT_MAX_PAGES;
use crate::source::ClientVariant;
use crate::stream::{StreamingContext, DEFAULT_HIGH_WATER_MARK};

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Client variant used for streaming calls.
    pub client: ClientVariant,
    pub high_water_mark: usize,
    pub max_playlist_pages: usize,
    pub language: String,
    pub region: String,
    pub bridge: BridgeConfig,
    pub rotation: RotationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Unset means "music search when signed in".
    pub protocol: Option<BridgeSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// CIDR block outbound requests are spread across.
    pub block: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientVariant::default(),
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            max_playlist_pages: DEFAULT_MAX_PAGES,
            language: "en".to_string(),
            region: "US".to_string(),
            bridge: BridgeConfig::default(),
            rotation: RotationConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default location. A missing file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Default config file location.
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubelink")
            .join("config.toml")
    }

    /// The configured IP rotator, if a block is set.
    pub fn rotator(&self) -> Result<Option<Arc<dyn IpRotator>>> {
        let Some(block) = self.rotation.block.as_deref().filter(|b| !b.trim().is_empty()) else {
            return Ok(None);
        };
        let rotator: CidrRotator = block
            .parse()
            .map_err(|e| Error::Config(format!("rotation.block: {e:#}")))?;
        Ok(Some(Arc::new(rotator)))
    }

    /// Streaming context for calls that do not install their own.
    pub fn streaming_context(&self) -> StreamingContext {
        StreamingContext::new(self.client).with_high_water_mark(self.high_water_mark)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::bridge::BridgeProtocol;

    #[test]
    fn parse_empty_config() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
client = "ios"
high_water_mark = 65536
max_playlist_pages = 10
language = "fi"
region = "FI"

[bridge]
protocol = "secondary"

[rotation]
block = "2001:db8::/48"
"#;
        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.client, ClientVariant::Ios);
        assert_eq!(config.high_water_mark, 65536);
        assert_eq!(config.max_playlist_pages, 10);
        assert_eq!(config.language, "fi");
        assert_eq!(
            config.bridge.protocol,
            Some(BridgeSetting::Fixed(BridgeProtocol::Secondary))
        );
        assert!(config.rotator().unwrap().is_some());

        let ctx = config.streaming_context();
        assert_eq!(ctx.client, ClientVariant::Ios);
        assert_eq!(ctx.high_water_mark(), 65536);
    }

    #[test]
    fn parse_per_kind_bridge_table() {
        let toml_str = r#"
[bridge.protocol]
default = "primary"
spotifySong = "secondary"
"#;
        let config = Config::parse(toml_str).unwrap();
        assert_eq!(
            config.bridge.protocol,
            Some(BridgeSetting::PerKind(HashMap::from([
                ("default".to_string(), BridgeProtocol::Primary),
                ("spotifySong".to_string(), BridgeProtocol::Secondary),
            ])))
        );
    }

    #[test]
    fn unknown_client_is_rejected() {
        assert!(Config::parse(r#"client = "netscape""#).is_err());
    }

    #[test]
    fn bad_rotation_block_is_config_error() {
        let config = Config::parse("[rotation]\nblock = \"10.0.0.0/99\"").unwrap();
        assert!(matches!(config.rotator(), Err(Error::Config(_))));
        assert!(Config::default().rotator().unwrap().is_none());
    }

    #[test]
    fn missing_file_is_default() {
        let path = std::env::temp_dir().join("tubelink-does-not-exist").join("config.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = std::env::temp_dir().join(format!("tubelink-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "max_playlist_pages = 3\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.max_playlist_pages, 3);
        assert_eq!(config.client, ClientVariant::Android);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
