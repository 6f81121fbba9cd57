use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use twilight_model::id::Id;

/// Points at a message the bot posted, so it can be edited later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: Id<ChannelMarker>,
    pub message_id: Id<MessageMarker>,
}
