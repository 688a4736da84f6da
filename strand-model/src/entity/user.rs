use serde::{Deserialize, Serialize};

use crate::id::{marker::UserMarker, Id};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    #[serde(rename = "username")]
    pub name: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// The account the client is logged in as, as reported by the ready payload.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CurrentUser {
    pub id: Id<UserMarker>,
    #[serde(rename = "username")]
    pub name: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}
