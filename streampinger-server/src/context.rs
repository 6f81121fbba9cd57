//! streampinger-server/src/context.rs
//!
//! Everything the server wires together at startup: pollers, the transition
//! bus, the Discord session and one notification hub per configured server.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

use streampinger_common::models::Platform;
use streampinger_core::platforms::PlatformClient;
use streampinger_core::platforms::discord::DiscordPlatform;
use streampinger_core::platforms::picarto::PicartoClient;
use streampinger_core::platforms::twitch::TwitchHelixClient;
use streampinger_core::platforms::youtube::YouTubeClient;
use streampinger_core::{
    Config, Error, NotificationHub, PlatformPoller, PollerExit, Streamer, TransitionBus,
};

pub struct ServerContext {
    pub config: Config,
    pub bus: Arc<TransitionBus>,
    pub discord: Arc<DiscordPlatform>,
    pub pollers: BTreeMap<Platform, Arc<PlatformPoller>>,
    pub hubs: Vec<Arc<NotificationHub>>,
}

impl ServerContext {
    /// Builds one poller per configured platform. Nothing is polled yet.
    pub fn new(config: Config, discord: Arc<DiscordPlatform>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let bus = Arc::new(TransitionBus::new());

        let mut clients: Vec<Arc<dyn PlatformClient>> = Vec::new();
        if let Some(yt) = &config.you_tube {
            clients.push(Arc::new(YouTubeClient::new(http.clone(), &yt.api_key)));
        }
        if config.picarto_enabled() {
            clients.push(Arc::new(PicartoClient::new(http.clone())));
        }
        if let Some(twitch) = &config.twitch {
            clients.push(Arc::new(TwitchHelixClient::new(
                http.clone(),
                &twitch.client_id,
                &twitch.client_secret,
            )));
        }

        let pollers = clients
            .into_iter()
            .map(|client| {
                let platform = client.platform();
                let settings = config.polling.settings_for(platform);
                let poller = Arc::new(PlatformPoller::new(client, bus.clone(), settings));
                (platform, poller)
            })
            .collect();

        Ok(Self {
            config,
            bus,
            discord,
            pollers,
            hubs: Vec::new(),
        })
    }

    /// Registers every configured account, then builds and subscribes the hubs.
    pub async fn wire(&mut self) -> Result<(), Error> {
        let mut streamers: BTreeMap<String, Arc<Streamer>> = BTreeMap::new();

        for (key, entry) in &self.config.streamers {
            let Some(discord_id) = Id::<UserMarker>::new_checked(entry.discord_id) else {
                warn!("Streamer '{}' has no Discord id; skipping", key);
                continue;
            };
            let mut streamer = Streamer::new(key.clone(), discord_id);

            for (platform, identifier) in entry.accounts() {
                let Some(poller) = self.pollers.get(&platform) else {
                    warn!(
                        "{} is not configured; ignoring account '{}' of streamer '{}'",
                        platform, identifier, key
                    );
                    continue;
                };
                match poller.register(identifier).await {
                    Ok(activity) => streamer.add_activity(activity),
                    Err(Error::NotFound(_)) => {
                        warn!("Could not find {} account '{}' for streamer '{}'", platform, identifier, key);
                    }
                    Err(e) => {
                        warn!(
                            "Failed to resolve {} account '{}' for streamer '{}': {}",
                            platform, identifier, key, e
                        );
                    }
                }
            }

            streamers.insert(key.clone(), Arc::new(streamer));
        }

        for server in &self.config.discord.servers {
            let binding = self.config.binding_for(server)?;
            let mut hub = NotificationHub::new(binding, self.discord.clone());
            for key in self.config.streamers_of(server) {
                if let Some(streamer) = streamers.get(key) {
                    hub.observe(streamer.clone());
                }
            }
            let hub = Arc::new(hub);
            let subscriptions = hub.attach(&self.bus);
            info!(
                "Guild {} follows {} streamer(s) through {} subscription(s)",
                hub.guild_id(),
                hub.streamers().len(),
                subscriptions
            );
            self.hubs.push(hub);
        }

        Ok(())
    }

    pub fn spawn_pollers(&self) -> Vec<JoinHandle<PollerExit>> {
        self.pollers
            .values()
            .map(|poller| {
                info!(
                    "Starting {} poller with {} account(s)",
                    poller.platform(),
                    poller.activities().len()
                );
                poller.clone().spawn()
            })
            .collect()
    }

    pub fn hubs_for(&self, guild_id: Id<GuildMarker>) -> impl Iterator<Item = &Arc<NotificationHub>> {
        self.hubs.iter().filter(move |h| h.guild_id() == guild_id)
    }
}
