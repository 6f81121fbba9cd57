// File: streampinger-common/src/models/mod.rs
pub mod activity;
pub mod discord;
pub mod platform;

pub use activity::{AccountProfile, ActivityStatus, LiveReport, StreamMetadata};
pub use discord::MessageHandle;
pub use platform::Platform;
