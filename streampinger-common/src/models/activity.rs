// File: streampinger-common/src/models/activity.rs

use serde::{Deserialize, Serialize};

/// Live state of one tracked account.
///
/// `Unknown` only exists between registration and the first completed poll;
/// it is never the source or target of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivityStatus {
    #[default]
    Unknown,
    Offline,
    Online,
}

impl ActivityStatus {
    pub fn is_online(self) -> bool {
        matches!(self, ActivityStatus::Online)
    }
}

/// What a live account is currently broadcasting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub url: String,
    pub category: String,
    pub title: String,
}

/// Profile data returned when resolving an account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Platform-side id used for every later poll.
    pub id: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// One account's entry in a poll batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveReport {
    pub is_live: bool,
    pub category: String,
    pub title: String,
    /// Canonical link to the stream (channel page or video).
    pub url: String,
}

impl LiveReport {
    pub fn offline() -> Self {
        Self {
            is_live: false,
            category: String::new(),
            title: String::new(),
            url: String::new(),
        }
    }

    pub fn status(&self) -> ActivityStatus {
        if self.is_live {
            ActivityStatus::Online
        } else {
            ActivityStatus::Offline
        }
    }

    /// Metadata for an Online report, `None` otherwise.
    pub fn metadata(&self) -> Option<StreamMetadata> {
        self.is_live.then(|| StreamMetadata {
            url: self.url.clone(),
            category: self.category.clone(),
            title: self.title.clone(),
        })
    }
}
