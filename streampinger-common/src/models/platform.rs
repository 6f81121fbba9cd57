// File: streampinger-common/src/models/platform.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Streaming platforms an account can be tracked on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "youTube")]
    YouTube,
    Picarto,
    Twitch,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::YouTube => write!(f, "youtube"),
            Platform::Picarto => write!(f, "picarto"),
            Platform::Twitch => write!(f, "twitch"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "youtube" => Ok(Platform::YouTube),
            "picarto" => Ok(Platform::Picarto),
            "twitch" => Ok(Platform::Twitch),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}
