use serde::{Deserialize, Serialize};

use super::User;
use crate::id::{
    marker::{ChannelMarker, GuildMarker, MessageMarker},
    Id,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Message {
    pub id: Id<MessageMarker>,
    pub channel_id: Id<ChannelMarker>,
    #[serde(default)]
    pub guild_id: Option<Id<GuildMarker>>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
}
