pub mod runtime;

pub use runtime::{DiscordGatewayEvent, DiscordPlatform};
