//! Types for the synchronous API's metadata and mutation endpoints.

use serde::{Deserialize, Serialize};

use crate::id::{marker::ChannelMarker, Id};

/// Response of the public gateway info endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayInfo {
    pub url: String,
}

/// Response of the authenticated gateway info endpoint; the session-start
/// metadata the orchestrator uses to pick a shard count.
#[derive(Clone, Debug, Deserialize)]
pub struct BotGatewayInfo {
    pub url: String,
    /// Shard count the remote recommends for this application.
    pub shards: u32,
    pub session_start_limit: SessionStartLimit,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct SessionStartLimit {
    pub total: u64,
    pub remaining: u64,
    /// Milliseconds until `remaining` resets.
    pub reset_after: u64,
    pub max_concurrency: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateMessageFields {
    pub content: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateChannelFields {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ModifyChannelFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ModifyGuildFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afk_channel_id: Option<Id<ChannelMarker>>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateRoleFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentionable: Option<bool>,
}

/// Error body the remote attaches to 4xx responses.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub message: String,
}
