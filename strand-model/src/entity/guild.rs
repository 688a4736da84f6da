use serde::{Deserialize, Serialize};

use super::{Channel, Member, Presence, Role, VoiceState};
use crate::id::{
    marker::{ChannelMarker, GuildMarker, UserMarker},
    Id,
};

/// Full guild snapshot.
///
/// The initial create event carries the nested channel/member/role/voice
/// collections; update events omit them, hence the defaults.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Guild {
    pub id: Id<GuildMarker>,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub owner_id: Id<UserMarker>,
    #[serde(default)]
    pub afk_channel_id: Option<Id<ChannelMarker>>,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
    #[serde(default)]
    pub presences: Vec<Presence>,
}

/// Stub delivered when a guild is or becomes unavailable due to an outage,
/// and in the initial ready payload before the full create events arrive.
#[derive(Copy, Clone, Debug, Deserialize, Serialize)]
pub struct UnavailableGuild {
    pub id: Id<GuildMarker>,
    #[serde(default)]
    pub unavailable: bool,
}
