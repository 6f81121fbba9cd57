//! src/config.rs
//!
//! JSON configuration loaded once at startup. Secrets may be overridden from
//! the environment (after `.env` has been loaded by the binary).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use streampinger_common::models::Platform;

use crate::Error;
use crate::notifier::{DestinationBinding, WelcomeTemplate};
use crate::notifier::welcome::parse_hex_color;
use crate::poller::{DEFAULT_MAX_CONSECUTIVE_FAILURES, ExhaustionPolicy, PollerSettings};

pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub twitch: Option<TwitchConfig>,
    #[serde(default)]
    pub you_tube: Option<YouTubeConfig>,
    #[serde(default)]
    pub picarto: Option<PicartoConfig>,
    /// Streamer key -> linked accounts.
    #[serde(default)]
    pub streamers: BTreeMap<String, StreamerConfig>,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

/// One destination. Id fields set to `0` count as unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub guild_id: u64,
    #[serde(default)]
    pub status_channel: Option<u64>,
    #[serde(default)]
    pub streaming_role: Option<u64>,
    #[serde(default)]
    pub pinged_role: Option<u64>,
    #[serde(default)]
    pub welcome: Option<WelcomeConfig>,
    #[serde(default)]
    pub streamers: Vec<String>,
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeConfig {
    pub channel: u64,
    pub title: String,
    pub description: String,
    /// Hex RGB, e.g. `"3498db"`.
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeConfig {
    #[serde(default)]
    pub client_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicartoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamerConfig {
    pub discord_id: u64,
    #[serde(default)]
    pub twitch: Option<String>,
    #[serde(default)]
    pub you_tube: Option<String>,
    #[serde(default)]
    pub picarto: Option<String>,
}

impl StreamerConfig {
    /// Configured identifiers in registration order: YouTube, Picarto, Twitch.
    pub fn accounts(&self) -> Vec<(Platform, &str)> {
        [
            (Platform::YouTube, self.you_tube.as_deref()),
            (Platform::Picarto, self.picarto.as_deref()),
            (Platform::Twitch, self.twitch.as_deref()),
        ]
        .into_iter()
        .filter_map(|(platform, id)| id.filter(|s| !s.trim().is_empty()).map(|s| (platform, s)))
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollingConfig {
    pub twitch_interval_secs: u64,
    pub picarto_interval_secs: u64,
    pub you_tube_interval_secs: u64,
    pub max_consecutive_failures: u32,
    pub isolate_subscriber_failures: bool,
    /// Switches exhaustion from stop to restart-after-cooldown.
    pub restart_cooldown_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            twitch_interval_secs: 10,
            picarto_interval_secs: 10,
            // Keeps the search endpoint under the daily quota.
            you_tube_interval_secs: 865,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            isolate_subscriber_failures: true,
            restart_cooldown_secs: None,
        }
    }
}

impl PollingConfig {
    pub fn settings_for(&self, platform: Platform) -> PollerSettings {
        let secs = match platform {
            Platform::Twitch => self.twitch_interval_secs,
            Platform::Picarto => self.picarto_interval_secs,
            Platform::YouTube => self.you_tube_interval_secs,
        };
        PollerSettings {
            interval: Duration::from_secs(secs.max(1)),
            max_consecutive_failures: self.max_consecutive_failures,
            isolate_subscriber_failures: self.isolate_subscriber_failures,
            exhaustion: match self.restart_cooldown_secs {
                Some(cooldown) => ExhaustionPolicy::Restart {
                    cooldown: Duration::from_secs(cooldown),
                },
                None => ExhaustionPolicy::Stop,
            },
        }
    }
}

fn default_true() -> bool {
    true
}

fn non_zero<T>(raw: Option<u64>) -> Option<Id<T>> {
    raw.and_then(Id::new_checked)
}

impl Config {
    /// Reads and parses `path`, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config = Self::from_json(&text)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Some(id) = lookup("TWITCH_CLIENT_ID") {
            let twitch = self.twitch.get_or_insert_with(|| TwitchConfig {
                client_id: String::new(),
                client_secret: String::new(),
            });
            twitch.client_id = id;
        }
        if let Some(secret) = lookup("TWITCH_CLIENT_SECRET") {
            let twitch = self.twitch.get_or_insert_with(|| TwitchConfig {
                client_id: String::new(),
                client_secret: String::new(),
            });
            twitch.client_secret = secret;
        }
        if let Some(key) = lookup("YOUTUBE_API_KEY") {
            let yt = self.you_tube.get_or_insert_with(|| YouTubeConfig {
                client_id: String::new(),
                api_key: String::new(),
            });
            yt.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.discord.token.trim().is_empty() {
            return Err(Error::Config("discord.token is empty".into()));
        }
        if let Some(twitch) = &self.twitch {
            if twitch.client_id.is_empty() || twitch.client_secret.is_empty() {
                return Err(Error::Config("twitch needs both clientId and clientSecret".into()));
            }
        }
        if let Some(yt) = &self.you_tube {
            if yt.api_key.is_empty() {
                return Err(Error::Config("youTube.apiKey is empty".into()));
            }
        }
        for server in &self.discord.servers {
            if Id::<GuildMarker>::new_checked(server.guild_id).is_none() {
                return Err(Error::Config("server guildId must be non-zero".into()));
            }
            if let Some(welcome) = &server.welcome {
                parse_hex_color(&welcome.color)?;
                if welcome.channel == 0 {
                    return Err(Error::Config(format!(
                        "welcome channel of guild {} must be non-zero",
                        server.guild_id
                    )));
                }
            }
        }
        for (key, streamer) in &self.streamers {
            if streamer.discord_id == 0 {
                return Err(Error::Config(format!("streamer '{key}' has no discordId")));
            }
        }
        Ok(())
    }

    pub fn picarto_enabled(&self) -> bool {
        self.picarto.as_ref().is_none_or(|p| p.enabled)
    }

    /// Hub binding for `server`. Validation must have passed.
    pub fn binding_for(&self, server: &ServerConfig) -> Result<DestinationBinding, Error> {
        let guild_id = Id::new_checked(server.guild_id)
            .ok_or_else(|| Error::Config("server guildId must be non-zero".into()))?;
        let welcome = match &server.welcome {
            Some(w) => Some(WelcomeTemplate {
                channel: Id::new_checked(w.channel)
                    .ok_or_else(|| Error::Config("welcome channel must be non-zero".into()))?,
                title: w.title.clone(),
                description: w.description.clone(),
                color: parse_hex_color(&w.color)?,
            }),
            None => None,
        };
        Ok(DestinationBinding {
            guild_id,
            status_channel: non_zero(server.status_channel),
            live_role: non_zero(server.streaming_role),
            ping_role: non_zero(server.pinged_role),
            welcome,
            platforms: server.platforms.clone(),
        })
    }

    /// Streamer keys of `server` that exist in `streamers`; unknown keys are logged and dropped.
    pub fn streamers_of<'a>(&'a self, server: &'a ServerConfig) -> Vec<&'a str> {
        server
            .streamers
            .iter()
            .filter(|key| {
                let known = self.streamers.contains_key(key.as_str());
                if !known {
                    warn!("Guild {} references unknown streamer '{}'", server.guild_id, key);
                }
                known
            })
            .map(String::as_str)
            .collect()
    }
}
