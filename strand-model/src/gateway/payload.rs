//! Typed payloads for the non-dispatch ops on both directions of the socket.

use serde::{Deserialize, Serialize};

use super::{Intents, OpCode};
use crate::{
    entity::{Activity, CurrentUser, Status, UnavailableGuild},
    id::{marker::ApplicationMarker, Id},
};

#[derive(Debug, Serialize)]
pub struct Identify {
    pub op: OpCode,
    pub d: IdentifyInfo,
}

impl Identify {
    pub fn new(d: IdentifyInfo) -> Self {
        Self {
            op: OpCode::Identify,
            d,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IdentifyInfo {
    pub token: String,
    pub shard: [u32; 2],
    pub intents: Intents,
    pub properties: IdentifyProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UpdatePresencePayload>,
    pub compress: bool,
    pub large_threshold: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_owned(),
            browser: "strand".to_owned(),
            device: "strand".to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Resume {
    pub op: OpCode,
    pub d: ResumeInfo,
}

impl Resume {
    pub fn new(token: String, session_id: String, seq: u64) -> Self {
        Self {
            op: OpCode::Resume,
            d: ResumeInfo {
                token,
                session_id,
                seq,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResumeInfo {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

#[derive(Debug, Serialize)]
pub struct Heartbeat {
    pub op: OpCode,
    pub d: Option<u64>,
}

impl Heartbeat {
    pub fn new(seq: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat,
            d: seq,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdatePresencePayload {
    pub status: Status,
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub afk: bool,
    /// Unix timestamp in ms of when the client went idle, if it did.
    pub since: Option<u64>,
}

impl UpdatePresencePayload {
    pub fn online() -> Self {
        Self {
            status: Status::Online,
            activities: Vec::new(),
            afk: false,
            since: None,
        }
    }
}

/// First inbound frame after connecting.
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

/// Initial-state payload concluding a successful identify.
#[derive(Clone, Debug, Deserialize)]
pub struct Ready {
    #[serde(rename = "v")]
    pub version: u8,
    pub user: CurrentUser,
    pub session_id: String,
    pub resume_gateway_url: String,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    #[serde(default)]
    pub shard: Option<[u32; 2]>,
    #[serde(default)]
    pub application: Option<ReadyApplication>,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct ReadyApplication {
    pub id: Id<ApplicationMarker>,
}
