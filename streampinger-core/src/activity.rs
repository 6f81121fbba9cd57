//! src/activity.rs
//!
//! Per-account live state (`Activity`) and the chat-side identity that
//! groups accounts across platforms (`Streamer`).
//!
//! A poller is the only writer of an `Activity`; notification hubs read it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;

use streampinger_common::models::{AccountProfile, ActivityStatus, LiveReport, Platform, StreamMetadata};

static NEXT_ACTIVITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one tracked account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivityId(u64);

impl ActivityId {
    fn next() -> Self {
        Self(NEXT_ACTIVITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "activity#{}", self.0)
    }
}

/// Point-in-time copy of an activity's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub display_name: String,
    pub avatar_url: String,
    pub status: ActivityStatus,
    /// `Some` exactly when `status` is `Online`.
    pub stream: Option<StreamMetadata>,
}

/// What a fresh poll result means for an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Same status as last recorded.
    Unchanged,
    /// First status ever seen; recorded without notifying anyone.
    Baseline(ActivityStatus),
    /// A real Offline <-> Online flip.
    Transition {
        from: ActivityStatus,
        to: ActivityStatus,
    },
}

pub struct Activity {
    id: ActivityId,
    platform: Platform,
    account_id: String,
    state: RwLock<ActivitySnapshot>,
}

impl Activity {
    /// A freshly registered account starts out `Unknown`.
    pub fn new(platform: Platform, profile: AccountProfile) -> Self {
        Self {
            id: ActivityId::next(),
            platform,
            account_id: profile.id,
            state: RwLock::new(ActivitySnapshot {
                display_name: profile.display_name,
                avatar_url: profile.avatar_url,
                status: ActivityStatus::Unknown,
                stream: None,
            }),
        }
    }

    pub fn id(&self) -> ActivityId {
        self.id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Platform-side id passed to the platform client on every poll.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        self.state.read().clone()
    }

    pub fn status(&self) -> ActivityStatus {
        self.state.read().status
    }

    pub fn display_name(&self) -> String {
        self.state.read().display_name.clone()
    }

    pub fn stream(&self) -> Option<StreamMetadata> {
        self.state.read().stream.clone()
    }

    /// Compares a poll result against the recorded status without mutating anything.
    pub fn observe(&self, report: &LiveReport) -> Observation {
        let previous = self.status();
        let next = report.status();
        if previous == next {
            Observation::Unchanged
        } else if previous == ActivityStatus::Unknown {
            Observation::Baseline(next)
        } else {
            Observation::Transition { from: previous, to: next }
        }
    }

    /// Records the latest poll result. Metadata is dropped unless the status is `Online`.
    /// Only the owning poller should call this.
    pub fn record(&self, report: &LiveReport, profile: Option<AccountProfile>) {
        let mut state = self.state.write();
        state.status = report.status();
        state.stream = report.metadata();
        if let Some(profile) = profile {
            state.display_name = profile.display_name;
            state.avatar_url = profile.avatar_url;
        }
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("account_id", &self.account_id)
            .field("state", &*self.state.read())
            .finish()
    }
}

/// A Discord member linked to zero or more tracked accounts.
#[derive(Debug)]
pub struct Streamer {
    key: String,
    discord_id: Id<UserMarker>,
    activities: Vec<Arc<Activity>>,
}

impl Streamer {
    pub fn new(key: impl Into<String>, discord_id: Id<UserMarker>) -> Self {
        Self {
            key: key.into(),
            discord_id,
            activities: Vec::new(),
        }
    }

    pub fn add_activity(&mut self, activity: Arc<Activity>) {
        self.activities.push(activity);
    }

    /// Config key this streamer was declared under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn discord_id(&self) -> Id<UserMarker> {
        self.discord_id
    }

    pub fn activities(&self) -> &[Arc<Activity>] {
        &self.activities
    }

    pub fn is_online(&self) -> bool {
        self.activities.iter().any(|a| a.status().is_online())
    }
}
