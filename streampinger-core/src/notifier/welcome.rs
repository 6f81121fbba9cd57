use twilight_model::channel::message::Embed;
use twilight_model::id::marker::{ChannelMarker, UserMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedBuilder;

use crate::Error;

/// Placeholder replaced with a mention of the joining member.
pub const USER_PLACEHOLDER: &str = "{user}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeTemplate {
    pub channel: Id<ChannelMarker>,
    pub title: String,
    pub description: String,
    pub color: u32,
}

impl WelcomeTemplate {
    pub fn render(&self, user: Id<UserMarker>) -> Embed {
        let mention = format!("<@{}>", user);
        EmbedBuilder::new()
            .title(self.title.replace(USER_PLACEHOLDER, &mention))
            .description(self.description.replace(USER_PLACEHOLDER, &mention))
            .color(self.color)
            .build()
    }
}

/// Accepts `3498db`, `#3498db` or `0x3498db`.
pub fn parse_hex_color(raw: &str) -> Result<u32, Error> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let color = u32::from_str_radix(digits, 16)
        .map_err(|e| Error::Config(format!("invalid hex color '{raw}': {e}")))?;
    if color > 0xFF_FFFF {
        return Err(Error::Config(format!("hex color '{raw}' is out of range")));
    }
    Ok(color)
}
