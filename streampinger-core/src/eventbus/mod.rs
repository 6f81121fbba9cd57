//! src/eventbus/mod.rs
//!
//! Explicit subscription registry for activity transitions.
//!
//! The orchestrator subscribes handlers per activity at startup; pollers look
//! up the subscribers of an activity and await each one in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use streampinger_common::models::{ActivityStatus, StreamMetadata};

use crate::Error;
use crate::activity::{Activity, ActivityId};

/// Fired once per real Offline <-> Online flip of an activity.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub activity: Arc<Activity>,
    pub status: ActivityStatus,
    /// `Some` iff `status` is `Online`.
    pub stream: Option<StreamMetadata>,
    pub timestamp: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(activity: Arc<Activity>, status: ActivityStatus, stream: Option<StreamMetadata>) -> Self {
        Self {
            activity,
            status,
            stream,
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
pub trait TransitionHandler: Send + Sync {
    /// Used in log lines when the handler fails.
    fn name(&self) -> &str;

    async fn on_transition(&self, event: &TransitionEvent) -> Result<(), Error>;
}

/// Activity id -> ordered handler list.
#[derive(Default)]
pub struct TransitionBus {
    subscribers: RwLock<HashMap<ActivityId, Vec<Arc<dyn TransitionHandler>>>>,
}

impl TransitionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the activity's subscriber list.
    pub fn subscribe(&self, activity: ActivityId, handler: Arc<dyn TransitionHandler>) {
        self.subscribers.write().entry(activity).or_default().push(handler);
    }

    /// Snapshot of the activity's subscribers, in registration order.
    pub fn subscribers(&self, activity: ActivityId) -> Vec<Arc<dyn TransitionHandler>> {
        self.subscribers
            .read()
            .get(&activity)
            .cloned()
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, activity: ActivityId) -> usize {
        self.subscribers.read().get(&activity).map_or(0, Vec::len)
    }
}
