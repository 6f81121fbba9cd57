// File: src/platforms/mod.rs

use std::collections::HashMap;

use async_trait::async_trait;
use twilight_model::channel::message::Embed;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use streampinger_common::models::{AccountProfile, LiveReport, MessageHandle, Platform};

use crate::Error;

/// Account lookup and live-status queries against one streaming platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> Platform;

    /// How many account ids one `poll_batch` request may carry.
    fn max_batch(&self) -> usize {
        1
    }

    /// Resolves a configured identifier (login, handle, channel name).
    /// `Ok(None)` means the platform has no such account.
    async fn resolve(&self, identifier: &str) -> Result<Option<AccountProfile>, Error>;

    /// Current live state for each id. Ids missing from the map are offline.
    async fn poll_batch(&self, account_ids: &[String]) -> Result<HashMap<String, LiveReport>, Error>;

    /// Re-reads display name and avatar after a transition.
    async fn refresh_profile(&self, _account_id: &str) -> Result<Option<AccountProfile>, Error> {
        Ok(None)
    }
}

/// The chat-side mutations a notification hub needs.
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_message(
        &self,
        channel: Id<ChannelMarker>,
        content: Option<&str>,
        embeds: &[Embed],
    ) -> Result<MessageHandle, Error>;

    async fn edit_message(&self, handle: MessageHandle, embeds: &[Embed]) -> Result<(), Error>;

    /// Role ids of a guild member, `None` if the user is not in the guild.
    async fn member_roles(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
    ) -> Result<Option<Vec<Id<RoleMarker>>>, Error>;

    async fn add_role(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
        role: Id<RoleMarker>,
    ) -> Result<(), Error>;

    async fn remove_role(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
        role: Id<RoleMarker>,
    ) -> Result<(), Error>;
}

pub mod discord;
pub mod picarto;
pub mod twitch;
pub mod youtube;
