use serde::{Deserialize, Serialize};

use super::User;
use crate::id::{
    marker::{GuildMarker, RoleMarker},
    Id,
};

/// A user's membership within one guild; keyed by `(guild_id, user.id)`.
///
/// `guild_id` is present on the standalone add/update events but absent when
/// the member arrives nested inside a guild payload.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Member {
    #[serde(default)]
    pub guild_id: Option<Id<GuildMarker>>,
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Id<RoleMarker>>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
}
