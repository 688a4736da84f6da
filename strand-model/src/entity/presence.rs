use serde::{Deserialize, Serialize};

use crate::id::{
    marker::{GuildMarker, UserMarker},
    Id,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Presence {
    pub user: PresenceUser,
    #[serde(default)]
    pub guild_id: Option<Id<GuildMarker>>,
    pub status: Status,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// Presence events only guarantee the user's id; the remaining user fields
/// are resolved through the cache on demand.
#[derive(Copy, Clone, Debug, Deserialize, Serialize)]
pub struct PresenceUser {
    pub id: Id<UserMarker>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    Idle,
    Invisible,
    Offline,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub url: Option<String>,
}
