use serde::Deserialize;
use serde_json::value::RawValue;

use super::payload::Ready;
use crate::{
    entity::{Channel, Guild, Member, Message, Presence, Role, User, VoiceState},
    id::{
        marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker},
        Id,
    },
};

/// Payload of a guild delete event; `unavailable` distinguishes an outage
/// from the client actually being removed from the guild.
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct GuildDelete {
    pub id: Id<GuildMarker>,
    #[serde(default)]
    pub unavailable: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MemberRemove {
    pub guild_id: Id<GuildMarker>,
    pub user: User,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RoleCreate {
    pub guild_id: Id<GuildMarker>,
    pub role: Role,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RoleUpdate {
    pub guild_id: Id<GuildMarker>,
    pub role: Role,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct RoleDelete {
    pub guild_id: Id<GuildMarker>,
    pub role_id: Id<RoleMarker>,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct MessageDelete {
    pub id: Id<MessageMarker>,
    pub channel_id: Id<ChannelMarker>,
    #[serde(default)]
    pub guild_id: Option<Id<GuildMarker>>,
}

/// Partial message; only changed fields are present.
#[derive(Clone, Debug, Deserialize)]
pub struct MessageUpdate {
    pub id: Id<MessageMarker>,
    pub channel_id: Id<ChannelMarker>,
    #[serde(default)]
    pub guild_id: Option<Id<GuildMarker>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct TypingStart {
    pub channel_id: Id<ChannelMarker>,
    #[serde(default)]
    pub guild_id: Option<Id<GuildMarker>>,
    pub user_id: Id<UserMarker>,
    pub timestamp: u64,
}

/// Hand-off point to the media transport: everything past this token and
/// endpoint is out of this library's hands.
#[derive(Clone, Debug, Deserialize)]
pub struct VoiceServerUpdate {
    pub token: String,
    pub guild_id: Id<GuildMarker>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// A dispatch event, one variant per recognized type tag.
///
/// Closed on purpose: the router matches exhaustively, so a newly handled
/// tag cannot be forgotten anywhere. Tags outside this set are dropped
/// before an `Event` is ever built.
#[derive(Clone, Debug)]
pub enum Event {
    Ready(Box<Ready>),
    Resumed,
    GuildCreate(Box<Guild>),
    GuildUpdate(Box<Guild>),
    GuildDelete(GuildDelete),
    ChannelCreate(Box<Channel>),
    ChannelUpdate(Box<Channel>),
    ChannelDelete(Box<Channel>),
    MessageCreate(Box<Message>),
    MessageUpdate(Box<MessageUpdate>),
    MessageDelete(MessageDelete),
    MemberAdd(Box<Member>),
    MemberUpdate(Box<Member>),
    MemberRemove(MemberRemove),
    RoleCreate(RoleCreate),
    RoleUpdate(RoleUpdate),
    RoleDelete(RoleDelete),
    PresenceUpdate(Box<Presence>),
    VoiceStateUpdate(Box<VoiceState>),
    VoiceServerUpdate(VoiceServerUpdate),
    UserUpdate(Box<User>),
    TypingStart(TypingStart),
}

impl Event {
    /// Deserialize a dispatch payload based on its type tag.
    ///
    /// `Ok(None)` means the tag is not recognized; per protocol evolution
    /// rules that is not an error.
    pub fn parse(tag: &str, d: Option<&RawValue>) -> Result<Option<Self>, serde_json::Error> {
        use serde::de::Error as _;

        if tag == "RESUMED" {
            return Ok(Some(Self::Resumed));
        }

        fn read<'de, T: Deserialize<'de>>(
            d: Option<&'de RawValue>,
        ) -> Result<T, serde_json::Error> {
            let d = d.ok_or_else(|| serde_json::Error::custom("missing dispatch payload"))?;

            serde_json::from_str(d.get())
        }

        let event = match tag {
            "READY" => Self::Ready(read(d)?),
            "GUILD_CREATE" => Self::GuildCreate(read(d)?),
            "GUILD_UPDATE" => Self::GuildUpdate(read(d)?),
            "GUILD_DELETE" => Self::GuildDelete(read(d)?),
            "CHANNEL_CREATE" => Self::ChannelCreate(read(d)?),
            "CHANNEL_UPDATE" => Self::ChannelUpdate(read(d)?),
            "CHANNEL_DELETE" => Self::ChannelDelete(read(d)?),
            "MESSAGE_CREATE" => Self::MessageCreate(read(d)?),
            "MESSAGE_UPDATE" => Self::MessageUpdate(read(d)?),
            "MESSAGE_DELETE" => Self::MessageDelete(read(d)?),
            "GUILD_MEMBER_ADD" => Self::MemberAdd(read(d)?),
            "GUILD_MEMBER_UPDATE" => Self::MemberUpdate(read(d)?),
            "GUILD_MEMBER_REMOVE" => Self::MemberRemove(read(d)?),
            "GUILD_ROLE_CREATE" => Self::RoleCreate(read(d)?),
            "GUILD_ROLE_UPDATE" => Self::RoleUpdate(read(d)?),
            "GUILD_ROLE_DELETE" => Self::RoleDelete(read(d)?),
            "PRESENCE_UPDATE" => Self::PresenceUpdate(read(d)?),
            "VOICE_STATE_UPDATE" => Self::VoiceStateUpdate(read(d)?),
            "VOICE_SERVER_UPDATE" => Self::VoiceServerUpdate(read(d)?),
            "USER_UPDATE" => Self::UserUpdate(read(d)?),
            "TYPING_START" => Self::TypingStart(read(d)?),
            _ => return Ok(None),
        };

        Ok(Some(event))
    }

    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::Resumed => EventKind::Resumed,
            Self::GuildCreate(_) => EventKind::GuildCreate,
            Self::GuildUpdate(_) => EventKind::GuildUpdate,
            Self::GuildDelete(_) => EventKind::GuildDelete,
            Self::ChannelCreate(_) => EventKind::ChannelCreate,
            Self::ChannelUpdate(_) => EventKind::ChannelUpdate,
            Self::ChannelDelete(_) => EventKind::ChannelDelete,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::MessageUpdate(_) => EventKind::MessageUpdate,
            Self::MessageDelete(_) => EventKind::MessageDelete,
            Self::MemberAdd(_) => EventKind::MemberAdd,
            Self::MemberUpdate(_) => EventKind::MemberUpdate,
            Self::MemberRemove(_) => EventKind::MemberRemove,
            Self::RoleCreate(_) => EventKind::RoleCreate,
            Self::RoleUpdate(_) => EventKind::RoleUpdate,
            Self::RoleDelete(_) => EventKind::RoleDelete,
            Self::PresenceUpdate(_) => EventKind::PresenceUpdate,
            Self::VoiceStateUpdate(_) => EventKind::VoiceStateUpdate,
            Self::VoiceServerUpdate(_) => EventKind::VoiceServerUpdate,
            Self::UserUpdate(_) => EventKind::UserUpdate,
            Self::TypingStart(_) => EventKind::TypingStart,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    Ready,
    Resumed,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MemberAdd,
    MemberUpdate,
    MemberRemove,
    RoleCreate,
    RoleUpdate,
    RoleDelete,
    PresenceUpdate,
    VoiceStateUpdate,
    VoiceServerUpdate,
    UserUpdate,
    TypingStart,
}
