use tracing::debug;
use twilight_model::channel::message::Embed;
use twilight_model::id::marker::RoleMarker;
use twilight_model::id::Id;
use twilight_util::builder::embed::{EmbedBuilder, ImageSource};

use streampinger_common::models::StreamMetadata;

/// Accent color of every live summary block.
pub const LIVE_EMBED_COLOR: u32 = 0x3498db;

/// One summary block: heading, category + title body, link and avatar thumbnail.
pub fn live_embed(display_name: &str, avatar_url: &str, stream: &StreamMetadata) -> Embed {
    let mut builder = EmbedBuilder::new()
        .title(format!("{} went live!", display_name))
        .description(format!("Streaming: **{}**\n\n{}", stream.category, stream.title))
        .color(LIVE_EMBED_COLOR)
        .url(stream.url.clone());

    if !avatar_url.is_empty() {
        match ImageSource::url(avatar_url) {
            Ok(source) => builder = builder.thumbnail(source),
            Err(e) => debug!("Skipping thumbnail '{}': {}", avatar_url, e),
        }
    }

    builder.build()
}

/// Message text that pings the configured role, if any.
pub fn ping_content(role: Option<Id<RoleMarker>>) -> Option<String> {
    role.map(|r| format!("<@&{}>", r))
}
