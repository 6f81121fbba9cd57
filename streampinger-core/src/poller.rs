//! src/poller.rs
//!
//! One `PlatformPoller` per streaming platform. It owns the platform's
//! activities, polls them forever and fans transitions out through the
//! [`TransitionBus`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use streampinger_common::models::{LiveReport, Platform};

use crate::Error;
use crate::activity::{Activity, Observation};
use crate::eventbus::{TransitionBus, TransitionEvent};
use crate::platforms::PlatformClient;

pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 1000;

/// What a poller does once consecutive failures hit the ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Leave the loop for good; the platform stays frozen at its last state.
    Stop,
    /// Wait `cooldown`, reset the counter and keep polling.
    Restart { cooldown: Duration },
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Base sleep between cycles, multiplied by `consecutive failures + 1`.
    pub interval: Duration,
    /// `0` disables the ceiling.
    pub max_consecutive_failures: u32,
    /// Log and swallow a failing subscriber instead of failing the cycle.
    pub isolate_subscriber_failures: bool,
    pub exhaustion: ExhaustionPolicy,
}

impl PollerSettings {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            isolate_subscriber_failures: true,
            exhaustion: ExhaustionPolicy::Stop,
        }
    }

    /// Sleep before the next cycle given the current failure streak.
    /// Saturates at `Duration::MAX` when the ceiling is disabled.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        self.interval
            .checked_mul(consecutive_failures.saturating_add(1))
            .unwrap_or(Duration::MAX)
    }
}

/// Why `run` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerExit {
    Exhausted { failures: u32 },
}

/// Counters for one completed registry pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub polled: usize,
    pub baselines: usize,
    pub transitions: usize,
}

pub struct PlatformPoller {
    client: Arc<dyn PlatformClient>,
    bus: Arc<TransitionBus>,
    settings: PollerSettings,
    activities: Mutex<Vec<Arc<Activity>>>,
}

impl PlatformPoller {
    pub fn new(client: Arc<dyn PlatformClient>, bus: Arc<TransitionBus>, settings: PollerSettings) -> Self {
        Self {
            client,
            bus,
            settings,
            activities: Mutex::new(Vec::new()),
        }
    }

    pub fn platform(&self) -> Platform {
        self.client.platform()
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Resolves `identifier` and starts tracking it as `Unknown`.
    ///
    /// Safe to call while `run` is active; the account joins the next cycle.
    /// An unknown account comes back as [`Error::NotFound`].
    pub async fn register(&self, identifier: &str) -> Result<Arc<Activity>, Error> {
        let platform = self.platform();
        let profile = self
            .client
            .resolve(identifier)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{platform} account '{identifier}'")))?;

        let activity = Arc::new(Activity::new(platform, profile));
        self.activities.lock().push(activity.clone());
        info!(
            "Tracking {} account '{}' as {} (platform id {})",
            platform,
            identifier,
            activity.id(),
            activity.account_id()
        );
        Ok(activity)
    }

    /// Point-in-time copy of the registry.
    pub fn activities(&self) -> Vec<Arc<Activity>> {
        self.activities.lock().clone()
    }

    /// One full pass over the registry.
    ///
    /// Accounts are handled strictly in order; a transition's subscribers all
    /// finish before the next account is looked at.
    pub async fn poll_once(&self) -> Result<CycleSummary, Error> {
        let snapshot = self.activities();
        let mut summary = CycleSummary::default();

        for chunk in snapshot.chunks(self.client.max_batch().max(1)) {
            let ids: Vec<String> = chunk.iter().map(|a| a.account_id().to_string()).collect();
            let reports = self.client.poll_batch(&ids).await?;

            for activity in chunk {
                summary.polled += 1;
                let report = reports
                    .get(activity.account_id())
                    .cloned()
                    .unwrap_or_else(LiveReport::offline);

                match activity.observe(&report) {
                    Observation::Unchanged => {}
                    Observation::Baseline(status) => {
                        debug!("{} baseline for {}: {:?}", self.platform(), activity.id(), status);
                        activity.record(&report, None);
                        summary.baselines += 1;
                    }
                    Observation::Transition { from, to } => {
                        let profile = match self.client.refresh_profile(activity.account_id()).await {
                            Ok(p) => p,
                            Err(e) => {
                                warn!("Could not refresh profile of {}: {}", activity.id(), e);
                                None
                            }
                        };
                        activity.record(&report, profile);
                        info!(
                            "{} account '{}' went {:?} -> {:?}",
                            self.platform(),
                            activity.display_name(),
                            from,
                            to
                        );
                        let event = TransitionEvent::new(activity.clone(), to, report.metadata());
                        self.dispatch(&event).await?;
                        summary.transitions += 1;
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn dispatch(&self, event: &TransitionEvent) -> Result<(), Error> {
        for handler in self.bus.subscribers(event.activity.id()) {
            if let Err(e) = handler.on_transition(event).await {
                if !self.settings.isolate_subscriber_failures {
                    return Err(e);
                }
                warn!(
                    "Subscriber '{}' failed on {} transition of {}: {}",
                    handler.name(),
                    self.platform(),
                    event.activity.id(),
                    e
                );
            }
        }
        Ok(())
    }

    /// Polls until the failure ceiling is reached (never, if it is disabled).
    pub async fn run(&self) -> PollerExit {
        let platform = self.platform();
        let max = self.settings.max_consecutive_failures;
        let mut failures: u32 = 0;
        info!("{} poller started (interval {:?})", platform, self.settings.interval);

        loop {
            match self.poll_once().await {
                Ok(summary) => {
                    failures = 0;
                    debug!("{} cycle done: {:?}", platform, summary);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    warn!("{} poll cycle failed ({} in a row): {}", platform, failures, e);
                }
            }

            if max > 0 && failures >= max {
                match &self.settings.exhaustion {
                    ExhaustionPolicy::Stop => {
                        error!(
                            "{} poller giving up after {} consecutive failures; its accounts stay at their last known state",
                            platform, failures
                        );
                        return PollerExit::Exhausted { failures };
                    }
                    ExhaustionPolicy::Restart { cooldown } => {
                        error!(
                            "{} poller hit {} consecutive failures; restarting in {:?}",
                            platform, failures, cooldown
                        );
                        sleep(*cooldown).await;
                        failures = 0;
                        continue;
                    }
                }
            }

            sleep(self.settings.delay_for(failures)).await;
        }
    }

    /// Runs the poller as a detached background task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<PollerExit> {
        tokio::spawn(async move { self.run().await })
    }
}
