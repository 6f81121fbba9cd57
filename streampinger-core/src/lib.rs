// src/lib.rs

pub mod activity;
pub mod config;
pub mod eventbus;
pub mod notifier;
pub mod platforms;
pub mod poller;

pub use activity::{Activity, ActivityId, Streamer};
pub use config::Config;
pub use eventbus::{TransitionBus, TransitionEvent, TransitionHandler};
pub use notifier::{DestinationBinding, NotificationHub};
pub use poller::{ExhaustionPolicy, PlatformPoller, PollerExit, PollerSettings};
pub use streampinger_common::error::Error;
