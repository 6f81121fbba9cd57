// tests/test_utils/mod.rs
//
// Scripted platform client, recording chat session and transition handlers
// shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use twilight_model::channel::message::Embed;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

use streampinger_common::models::{AccountProfile, ActivityStatus, LiveReport, MessageHandle, Platform};
use streampinger_core::Error;
use streampinger_core::eventbus::{TransitionEvent, TransitionHandler};
use streampinger_core::platforms::{ChatSession, PlatformClient};
use streampinger_core::poller::{ExhaustionPolicy, PollerSettings};

/// Polls `check` every few milliseconds until it holds or two seconds pass.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

pub fn fast_settings(isolate: bool) -> PollerSettings {
    PollerSettings {
        interval: Duration::from_millis(1),
        max_consecutive_failures: 3,
        isolate_subscriber_failures: isolate,
        exhaustion: ExhaustionPolicy::Stop,
    }
}

// ---------------------------------------------------------------------------
// Platform side
// ---------------------------------------------------------------------------

/// Answers polls from a mutable table of account states.
pub struct ScriptedClient {
    platform: Platform,
    max_batch: usize,
    profiles: Mutex<HashMap<String, AccountProfile>>,
    live: Mutex<HashMap<String, LiveReport>>,
    failing: Mutex<bool>,
    /// Per-call outcomes (`true` = fail) consumed before `failing` applies.
    script: Mutex<VecDeque<bool>>,
    pub poll_calls: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub profile_refreshes: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            max_batch: 1,
            profiles: Mutex::new(HashMap::new()),
            live: Mutex::new(HashMap::new()),
            failing: Mutex::new(false),
            script: Mutex::new(VecDeque::new()),
            poll_calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
            profile_refreshes: AtomicUsize::new(0),
        }
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Makes `login` resolvable; its platform id is `{login}-id`.
    pub fn add_account(&self, login: &str) {
        self.profiles.lock().insert(
            login.to_string(),
            AccountProfile {
                id: format!("{login}-id"),
                display_name: login.to_string(),
                avatar_url: format!("https://cdn.example/{login}.png"),
            },
        );
    }

    pub fn rename(&self, login: &str, display_name: &str) {
        if let Some(profile) = self.profiles.lock().get_mut(login) {
            profile.display_name = display_name.to_string();
        }
    }

    pub fn set_live(&self, login: &str, category: &str, title: &str) {
        self.live.lock().insert(
            format!("{login}-id"),
            LiveReport {
                is_live: true,
                category: category.to_string(),
                title: title.to_string(),
                url: format!("https://{}.example/{login}", self.platform),
            },
        );
    }

    pub fn set_offline(&self, login: &str) {
        self.live.lock().remove(&format!("{login}-id"));
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn script_outcomes(&self, fails: &[bool]) {
        self.script.lock().extend(fails.iter().copied());
    }
}

#[async_trait]
impl PlatformClient for ScriptedClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn max_batch(&self) -> usize {
        self.max_batch
    }

    async fn resolve(&self, identifier: &str) -> Result<Option<AccountProfile>, Error> {
        Ok(self.profiles.lock().get(identifier).cloned())
    }

    async fn poll_batch(&self, account_ids: &[String]) -> Result<HashMap<String, LiveReport>, Error> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().push(account_ids.len());
        let fail = self.script.lock().pop_front().unwrap_or(*self.failing.lock());
        if fail {
            return Err(Error::Platform("scripted outage".into()));
        }
        let live = self.live.lock();
        Ok(account_ids
            .iter()
            .filter_map(|id| live.get(id).map(|r| (id.clone(), r.clone())))
            .collect())
    }

    async fn refresh_profile(&self, account_id: &str) -> Result<Option<AccountProfile>, Error> {
        self.profile_refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.lock().values().find(|p| p.id == account_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Transition handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SeenEvent {
    pub account_id: String,
    pub status: ActivityStatus,
    pub category: Option<String>,
    pub title: Option<String>,
    /// Activity status as read from inside the handler.
    pub recorded_status: ActivityStatus,
    pub display_name: String,
}

pub struct RecordingHandler {
    name: String,
    pub events: Mutex<Vec<SeenEvent>>,
    /// Shared across handlers to check delivery order.
    order: Option<Arc<Mutex<Vec<String>>>>,
}

impl RecordingHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events: Mutex::new(Vec::new()),
            order: None,
        }
    }

    pub fn with_order_log(name: &str, order: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            order: Some(order),
            ..Self::new(name)
        }
    }

    pub fn seen(&self) -> Vec<SeenEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl TransitionHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_transition(&self, event: &TransitionEvent) -> Result<(), Error> {
        self.events.lock().push(SeenEvent {
            account_id: event.activity.account_id().to_string(),
            status: event.status,
            category: event.stream.as_ref().map(|s| s.category.clone()),
            title: event.stream.as_ref().map(|s| s.title.clone()),
            recorded_status: event.activity.status(),
            display_name: event.activity.display_name(),
        });
        if let Some(order) = &self.order {
            order.lock().push(self.name.clone());
        }
        Ok(())
    }
}

pub struct FailingHandler {
    pub calls: AtomicUsize,
}

impl FailingHandler {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TransitionHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    async fn on_transition(&self, _event: &TransitionEvent) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Platform("handler exploded".into()))
    }
}

// ---------------------------------------------------------------------------
// Chat side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ChatCall {
    Send {
        channel: Id<ChannelMarker>,
        content: Option<String>,
        embeds: Vec<Embed>,
        handle: MessageHandle,
    },
    Edit {
        handle: MessageHandle,
        embeds: Vec<Embed>,
    },
    AddRole {
        user: Id<UserMarker>,
        role: Id<RoleMarker>,
    },
    RemoveRole {
        user: Id<UserMarker>,
        role: Id<RoleMarker>,
    },
}

/// In-memory guild: records every mutation and tracks member roles.
pub struct RecordingChat {
    pub calls: Mutex<Vec<ChatCall>>,
    members: Mutex<HashMap<(Id<GuildMarker>, Id<UserMarker>), Vec<Id<RoleMarker>>>>,
    next_message: AtomicU64,
    fail_roles: Mutex<bool>,
    fail_messages: Mutex<bool>,
    send_delay: Mutex<Option<Duration>>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            members: Mutex::new(HashMap::new()),
            next_message: AtomicU64::new(1000),
            fail_roles: Mutex::new(false),
            fail_messages: Mutex::new(false),
            send_delay: Mutex::new(None),
        }
    }

    pub fn add_member(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) {
        self.members.lock().insert((guild, user), Vec::new());
    }

    pub fn has_role(&self, guild: Id<GuildMarker>, user: Id<UserMarker>, role: Id<RoleMarker>) -> bool {
        self.members
            .lock()
            .get(&(guild, user))
            .is_some_and(|roles| roles.contains(&role))
    }

    pub fn set_fail_roles(&self, fail: bool) {
        *self.fail_roles.lock() = fail;
    }

    pub fn set_fail_messages(&self, fail: bool) {
        *self.fail_messages.lock() = fail;
    }

    /// Makes every send take `delay`, like a slow Discord REST call.
    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().clone()
    }

    pub fn sends(&self) -> Vec<ChatCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ChatCall::Send { .. }))
            .collect()
    }

    pub fn edits(&self) -> Vec<ChatCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ChatCall::Edit { .. }))
            .collect()
    }
}

#[async_trait]
impl ChatSession for RecordingChat {
    async fn send_message(
        &self,
        channel: Id<ChannelMarker>,
        content: Option<&str>,
        embeds: &[Embed],
    ) -> Result<MessageHandle, Error> {
        let delay = *self.send_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_messages.lock() {
            return Err(Error::Platform("Missing Permissions".into()));
        }
        let handle = MessageHandle {
            channel_id: channel,
            message_id: Id::new(self.next_message.fetch_add(1, Ordering::SeqCst)),
        };
        self.calls.lock().push(ChatCall::Send {
            channel,
            content: content.map(str::to_string),
            embeds: embeds.to_vec(),
            handle,
        });
        Ok(handle)
    }

    async fn edit_message(&self, handle: MessageHandle, embeds: &[Embed]) -> Result<(), Error> {
        if *self.fail_messages.lock() {
            return Err(Error::Platform("Missing Permissions".into()));
        }
        self.calls.lock().push(ChatCall::Edit {
            handle,
            embeds: embeds.to_vec(),
        });
        Ok(())
    }

    async fn member_roles(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
    ) -> Result<Option<Vec<Id<RoleMarker>>>, Error> {
        Ok(self.members.lock().get(&(guild, user)).cloned())
    }

    async fn add_role(&self, guild: Id<GuildMarker>, user: Id<UserMarker>, role: Id<RoleMarker>) -> Result<(), Error> {
        if *self.fail_roles.lock() {
            return Err(Error::Platform("Missing Permissions".into()));
        }
        if let Some(roles) = self.members.lock().get_mut(&(guild, user)) {
            roles.push(role);
        }
        self.calls.lock().push(ChatCall::AddRole { user, role });
        Ok(())
    }

    async fn remove_role(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
        role: Id<RoleMarker>,
    ) -> Result<(), Error> {
        if *self.fail_roles.lock() {
            return Err(Error::Platform("Missing Permissions".into()));
        }
        if let Some(roles) = self.members.lock().get_mut(&(guild, user)) {
            roles.retain(|r| *r != role);
        }
        self.calls.lock().push(ChatCall::RemoveRole { user, role });
        Ok(())
    }
}

pub fn embed_titles(embeds: &[Embed]) -> Vec<String> {
    embeds.iter().filter_map(|e| e.title.clone()).collect()
}
