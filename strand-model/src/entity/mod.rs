mod channel;
mod guild;
mod member;
mod message;
mod presence;
mod role;
mod user;
mod voice;

pub use self::{
    channel::{Channel, ChannelKind},
    guild::{Guild, UnavailableGuild},
    member::Member,
    message::Message,
    presence::{Activity, Presence, PresenceUser, Status},
    role::Role,
    user::{CurrentUser, User},
    voice::VoiceState,
};
