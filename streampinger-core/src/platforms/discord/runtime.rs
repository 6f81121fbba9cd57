use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_gateway::{CloseFrame, Event, EventTypeFlags, Intents, MessageSender, Shard, ShardId, StreamExt};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::channel::message::Embed;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use streampinger_common::models::MessageHandle;

use crate::Error;
use crate::platforms::ChatSession;

/// Gateway events the orchestrator reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscordGatewayEvent {
    Ready {
        guild_count: usize,
    },
    MemberJoined {
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        is_bot: bool,
    },
}

/// Reads the shard until it closes and forwards the events we care about to `tx`.
async fn shard_runner(mut shard: Shard, tx: UnboundedSender<DiscordGatewayEvent>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    let wanted = EventTypeFlags::READY | EventTypeFlags::MEMBER_ADD;
    while let Some(item) = shard.next_event(wanted).await {
        let forwarded = match item {
            Ok(Event::Ready(ready)) => {
                info!(
                    "Shard {shard_id} => READY as {} (ID={}), {} guild(s)",
                    ready.user.name,
                    ready.user.id,
                    ready.guilds.len()
                );
                Some(DiscordGatewayEvent::Ready {
                    guild_count: ready.guilds.len(),
                })
            }
            Ok(Event::MemberAdd(member_add)) => {
                let user = &member_add.member.user;
                debug!("Shard {shard_id} => member {} joined guild {}", user.id, member_add.guild_id);
                Some(DiscordGatewayEvent::MemberJoined {
                    guild_id: member_add.guild_id,
                    user_id: user.id,
                    is_bot: user.bot,
                })
            }
            Ok(event) => {
                trace!("Shard {shard_id} => unhandled event: {:?}", event.kind());
                None
            }
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                None
            }
        };

        if let Some(evt) = forwarded {
            if tx.send(evt).is_err() {
                debug!("Shard {shard_id} => receiver dropped; stopping");
                break;
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Discord bot session: REST client plus a single gateway shard.
pub struct DiscordPlatform {
    token: String,
    http: Arc<HttpClient>,
    rx: Mutex<Option<UnboundedReceiver<DiscordGatewayEvent>>>,
    shard_task: Option<JoinHandle<()>>,
    shard_sender: Option<MessageSender>,
}

impl DiscordPlatform {
    pub fn new(token: String) -> Self {
        let http = Arc::new(
            ClientBuilder::new()
                .token(token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        Self {
            token,
            http,
            rx: Mutex::new(None),
            shard_task: None,
            shard_sender: None,
        }
    }

    /// Opens the gateway shard. Member events need the privileged GUILD_MEMBERS intent.
    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.shard_task.is_some() {
            info!("(DiscordPlatform) Already connected => skipping");
            return Ok(());
        }
        if self.token.is_empty() {
            return Err(Error::Auth("Discord token is empty".into()));
        }

        let (tx, rx) = unbounded_channel::<DiscordGatewayEvent>();
        *self.rx.lock().await = Some(rx);

        let shard = Shard::new(
            ShardId::ONE,
            self.token.clone(),
            Intents::GUILDS | Intents::GUILD_MEMBERS,
        );
        self.shard_sender = Some(shard.sender());
        self.shard_task = Some(tokio::spawn(shard_runner(shard, tx)));
        Ok(())
    }

    /// Waits for the next forwarded gateway event; `None` once the shard is gone.
    pub async fn next_event(&self) -> Option<DiscordGatewayEvent> {
        let mut guard = self.rx.lock().await;
        match guard.as_mut() {
            Some(r) => r.recv().await,
            None => None,
        }
    }

    /// Sends a normal close frame; the shard runner then drains and exits.
    pub fn close(&self) {
        if let Some(sender) = &self.shard_sender {
            let _ = sender.close(CloseFrame::NORMAL);
        }
    }
}

#[async_trait]
impl ChatSession for DiscordPlatform {
    async fn send_message(
        &self,
        channel: Id<ChannelMarker>,
        content: Option<&str>,
        embeds: &[Embed],
    ) -> Result<MessageHandle, Error> {
        let mut request = self.http.create_message(channel).embeds(embeds);
        if let Some(text) = content {
            request = request.content(text);
        }
        let message = request.await?.model().await?;
        Ok(MessageHandle {
            channel_id: message.channel_id,
            message_id: message.id,
        })
    }

    async fn edit_message(&self, handle: MessageHandle, embeds: &[Embed]) -> Result<(), Error> {
        self.http
            .update_message(handle.channel_id, handle.message_id)
            .embeds(Some(embeds))
            .await?;
        Ok(())
    }

    async fn member_roles(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
    ) -> Result<Option<Vec<Id<RoleMarker>>>, Error> {
        match self.http.guild_member(guild, user).await {
            Ok(resp) => Ok(Some(resp.model().await?.roles)),
            Err(e) => {
                let err = Error::from(e);
                if err.is_discord_status(404) {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn add_role(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
        role: Id<RoleMarker>,
    ) -> Result<(), Error> {
        self.http.add_guild_member_role(guild, user, role).await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
        role: Id<RoleMarker>,
    ) -> Result<(), Error> {
        self.http.remove_guild_member_role(guild, user, role).await?;
        Ok(())
    }
}
