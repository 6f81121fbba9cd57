//! src/notifier/hub.rs
//!
//! One `NotificationHub` per Discord destination. It keeps a single live
//! message and the live role of every observed streamer in line with the
//! online state of that streamer's activities.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use twilight_model::channel::message::Embed;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use streampinger_common::models::{MessageHandle, Platform, StreamMetadata};

use crate::Error;
use crate::activity::{Activity, ActivityId, Streamer};
use crate::eventbus::{TransitionBus, TransitionEvent, TransitionHandler};
use crate::notifier::render::{live_embed, ping_content};
use crate::notifier::welcome::WelcomeTemplate;
use crate::platforms::ChatSession;

/// Where and how a hub announces streams.
#[derive(Debug, Clone)]
pub struct DestinationBinding {
    pub guild_id: Id<GuildMarker>,
    pub status_channel: Option<Id<ChannelMarker>>,
    pub live_role: Option<Id<RoleMarker>>,
    pub ping_role: Option<Id<RoleMarker>>,
    pub welcome: Option<WelcomeTemplate>,
    /// `None` observes every platform.
    pub platforms: Option<Vec<Platform>>,
}

impl DestinationBinding {
    pub fn new(guild_id: Id<GuildMarker>) -> Self {
        Self {
            guild_id,
            status_channel: None,
            live_role: None,
            ping_role: None,
            welcome: None,
            platforms: None,
        }
    }

    pub fn observes(&self, platform: Platform) -> bool {
        self.platforms.as_ref().is_none_or(|p| p.contains(&platform))
    }
}

/// The message currently announcing a streamer, plus what each block shows.
#[derive(Debug, Clone)]
struct LiveMessage {
    handle: MessageHandle,
    streams: HashMap<ActivityId, StreamMetadata>,
}

pub struct NotificationHub {
    name: String,
    binding: DestinationBinding,
    chat: Arc<dyn ChatSession>,
    streamers: Vec<Arc<Streamer>>,
    by_activity: HashMap<ActivityId, Arc<Streamer>>,
    live_messages: Mutex<HashMap<String, LiveMessage>>,
}

impl NotificationHub {
    pub fn new(binding: DestinationBinding, chat: Arc<dyn ChatSession>) -> Self {
        Self {
            name: format!("hub:{}", binding.guild_id),
            binding,
            chat,
            streamers: Vec::new(),
            by_activity: HashMap::new(),
            live_messages: Mutex::new(HashMap::new()),
        }
    }

    pub fn guild_id(&self) -> Id<GuildMarker> {
        self.binding.guild_id
    }

    pub fn streamers(&self) -> &[Arc<Streamer>] {
        &self.streamers
    }

    /// Starts watching `streamer`. Returns the ids of the activities this
    /// destination actually observes after the platform filter.
    pub fn observe(&mut self, streamer: Arc<Streamer>) -> Vec<ActivityId> {
        let ids: Vec<ActivityId> = streamer
            .activities()
            .iter()
            .filter(|a| self.binding.observes(a.platform()))
            .map(|a| a.id())
            .collect();
        for id in &ids {
            self.by_activity.insert(*id, streamer.clone());
        }
        debug!(
            "{} observes streamer '{}' through {} activities",
            self.name,
            streamer.key(),
            ids.len()
        );
        self.streamers.push(streamer);
        ids
    }

    /// Subscribes the hub to every activity it observes. Returns the count.
    pub fn attach(self: &Arc<Self>, bus: &TransitionBus) -> usize {
        let mut count = 0;
        for streamer in &self.streamers {
            for activity in self.observed(streamer) {
                bus.subscribe(activity.id(), self.clone());
                count += 1;
            }
        }
        count
    }

    pub fn is_observing(&self, activity: ActivityId) -> bool {
        self.by_activity.contains_key(&activity)
    }

    /// Handle of the message currently announcing `streamer_key`, if any.
    pub async fn live_message(&self, streamer_key: &str) -> Option<MessageHandle> {
        self.live_messages.lock().await.get(streamer_key).map(|m| m.handle)
    }

    /// Activities whose blocks the streamer's live message currently shows.
    pub async fn live_blocks(&self, streamer_key: &str) -> Vec<ActivityId> {
        let messages = self.live_messages.lock().await;
        let mut ids: Vec<ActivityId> = messages
            .get(streamer_key)
            .map(|m| m.streams.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    fn observed<'a>(&'a self, streamer: &'a Streamer) -> impl Iterator<Item = &'a Arc<Activity>> + 'a {
        streamer
            .activities()
            .iter()
            .filter(move |a| self.binding.observes(a.platform()))
    }

    /// Posts the welcome embed for a new member. No-op for bots or without a template.
    pub async fn on_member_joined(&self, user: Id<UserMarker>, is_bot: bool) -> Result<(), Error> {
        if is_bot {
            debug!("{} ignoring bot join {}", self.name, user);
            return Ok(());
        }
        let Some(welcome) = &self.binding.welcome else {
            return Ok(());
        };
        let embed = welcome.render(user);
        self.chat.send_message(welcome.channel, None, &[embed]).await?;
        info!("{} welcomed member {}", self.name, user);
        Ok(())
    }

    async fn sync_role(&self, streamer: &Streamer, online: bool) {
        let Some(role) = self.binding.live_role else {
            return;
        };
        let guild = self.binding.guild_id;
        let user = streamer.discord_id();

        let roles = match self.chat.member_roles(guild, user).await {
            Ok(Some(roles)) => roles,
            Ok(None) => {
                debug!("{}: member {} is not in the guild, skipping role sync", self.name, user);
                return;
            }
            Err(e) => {
                warn!("{}: could not look up member {}: {}", self.name, user, e);
                return;
            }
        };

        let has_role = roles.contains(&role);
        if online && !has_role {
            match self.chat.add_role(guild, user, role).await {
                Ok(()) => info!("Added live role to {} in guild {}", streamer.key(), guild),
                Err(e) => warn!("Failed to add live role to {} in guild {}: {}", streamer.key(), guild, e),
            }
        } else if !online && has_role {
            match self.chat.remove_role(guild, user, role).await {
                Ok(()) => info!("Removed live role from {} in guild {}", streamer.key(), guild),
                Err(e) => warn!("Failed to remove live role from {} in guild {}: {}", streamer.key(), guild, e),
            }
        }
    }

    fn render(&self, online: &[&Arc<Activity>], streams: &HashMap<ActivityId, StreamMetadata>) -> Vec<Embed> {
        online
            .iter()
            .filter_map(|a| {
                let stream = streams.get(&a.id())?;
                let snap = a.snapshot();
                Some(live_embed(&snap.display_name, &snap.avatar_url, stream))
            })
            .collect()
    }

    async fn sync_message(
        &self,
        messages: &mut HashMap<String, LiveMessage>,
        streamer: &Streamer,
        online: &[&Arc<Activity>],
        event: &TransitionEvent,
    ) -> Result<(), Error> {
        let Some(channel) = self.binding.status_channel else {
            return Ok(());
        };
        let key = streamer.key();

        if online.is_empty() {
            // The posted message is left as it is.
            if messages.remove(key).is_some() {
                info!("{}: {} is offline, no longer tracking its live message", self.name, key);
            }
            return Ok(());
        }

        let previous = messages.get(key).map(|m| &m.streams);
        let mut streams = HashMap::with_capacity(online.len());
        for activity in online {
            let stream = if activity.id() == event.activity.id() {
                event.stream.clone()
            } else {
                previous
                    .and_then(|s| s.get(&activity.id()).cloned())
                    .or_else(|| activity.stream())
            };
            if let Some(stream) = stream {
                streams.insert(activity.id(), stream);
            }
        }
        let embeds = self.render(online, &streams);

        if let Some(record) = messages.get_mut(key) {
            self.chat.edit_message(record.handle, &embeds).await?;
            // Only what Discord actually shows.
            record.streams = streams;
            debug!("{}: edited live message of {} ({} blocks)", self.name, key, embeds.len());
        } else {
            let content = ping_content(self.binding.ping_role);
            let handle = self.chat.send_message(channel, content.as_deref(), &embeds).await?;
            messages.insert(key.to_string(), LiveMessage { handle, streams });
            info!(
                "{}: posted live message for {} (live since {})",
                self.name,
                key,
                event.timestamp.format("%H:%M:%S UTC")
            );
        }
        Ok(())
    }
}

#[async_trait]
impl TransitionHandler for NotificationHub {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_transition(&self, event: &TransitionEvent) -> Result<(), Error> {
        let Some(streamer) = self.by_activity.get(&event.activity.id()) else {
            debug!("{}: {} is not observed here", self.name, event.activity.id());
            return Ok(());
        };

        // Held for the whole handler so two pollers can't race on one streamer.
        let mut messages = self.live_messages.lock().await;

        let online: Vec<&Arc<Activity>> = self.observed(streamer).filter(|a| a.status().is_online()).collect();
        self.sync_role(streamer, !online.is_empty()).await;

        if let Err(e) = self.sync_message(&mut messages, streamer, &online, event).await {
            warn!("{}: live message sync for {} failed: {}", self.name, streamer.key(), e);
        }
        Ok(())
    }
}
