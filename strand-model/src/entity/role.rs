use serde::{Deserialize, Serialize};

use crate::id::{marker::RoleMarker, Id};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Role {
    pub id: Id<RoleMarker>,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub mentionable: bool,
}
