//! InnerTube client variants.
//!
//! YouTube serves different formats (and different throttling) depending on
//! which first-party client a request claims to be. The variant is chosen per
//! streaming call through [`crate::stream::StreamingContext`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// First-party client a request identifies as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientVariant {
    /// Desktop web player.
    Web,
    /// Android app. Returns direct (unciphered) format URLs.
    #[default]
    Android,
    /// iOS app. Returns direct format URLs and HLS for live content.
    Ios,
    /// Embedded TV player.
    Tv,
    /// YouTube Music web player.
    WebRemix,
}

/// Static identity sent in the InnerTube `context.client` block.
#[derive(Debug, Clone, Copy)]
pub struct ClientProfile {
    pub name: &'static str,
    pub version: &'static str,
    pub name_id: u32,
    pub user_agent: &'static str,
    pub android_sdk_version: Option<u32>,
}

const WEB: ClientProfile = ClientProfile {
    name: "WEB",
    version: "2.20241126.01.00",
    name_id: 1,
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    android_sdk_version: None,
};

const ANDROID: ClientProfile = ClientProfile {
    name: "ANDROID",
    version: "19.44.38",
    name_id: 3,
    user_agent: "com.google.android.youtube/19.44.38 (Linux; U; Android 14; en_US; Pixel 8) gzip",
    android_sdk_version: Some(34),
};

const IOS: ClientProfile = ClientProfile {
    name: "IOS",
    version: "19.45.4",
    name_id: 5,
    user_agent: "com.google.ios.youtube/19.45.4 (iPhone16,2; U; CPU iOS 18_1_0 like Mac OS X;)",
    android_sdk_version: None,
};

const TV: ClientProfile = ClientProfile {
    name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
    version: "2.0",
    name_id: 85,
    user_agent: "Mozilla/5.0 (PlayStation; PlayStation 4/12.00) AppleWebKit/605.1.15 (KHTML, like Gecko)",
    android_sdk_version: None,
};

const WEB_REMIX: ClientProfile = ClientProfile {
    name: "WEB_REMIX",
    version: "1.20241127.01.00",
    name_id: 67,
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    android_sdk_version: None,
};

impl ClientVariant {
    /// All variants, in the order they are usually tried.
    pub const ALL: [ClientVariant; 5] = [
        ClientVariant::Android,
        ClientVariant::Ios,
        ClientVariant::Web,
        ClientVariant::Tv,
        ClientVariant::WebRemix,
    ];

    #[must_use]
    pub fn profile(self) -> ClientProfile {
        match self {
            Self::Web => WEB,
            Self::Android => ANDROID,
            Self::Ios => IOS,
            Self::Tv => TV,
            Self::WebRemix => WEB_REMIX,
        }
    }

    /// Snake-case name as used in config files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Tv => "tv",
            Self::WebRemix => "web_remix",
        }
    }
}

impl fmt::Display for ClientVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "web" => Ok(Self::Web),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            "tv" => Ok(Self::Tv),
            "web_remix" | "music" => Ok(Self::WebRemix),
            other => Err(format!("unknown client variant: {other}")),
        }
    }
}
