use serde::{Deserialize, Serialize};

use crate::id::{
    marker::{ChannelMarker, GuildMarker, UserMarker},
    Id,
};

/// A user's voice connection state within a guild; keyed by
/// `(guild_id, user_id)`. A null `channel_id` means the user left voice.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VoiceState {
    #[serde(default)]
    pub guild_id: Option<Id<GuildMarker>>,
    #[serde(default)]
    pub channel_id: Option<Id<ChannelMarker>>,
    pub user_id: Id<UserMarker>,
    pub session_id: String,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
}
