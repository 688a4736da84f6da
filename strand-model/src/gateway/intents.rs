use std::fmt::{Formatter, Result as FmtResult};

use bitflags::bitflags;
use serde::{
    de::{Error as DeError, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

bitflags! {
    /// Bitmask declared at identify time restricting which event categories
    /// the remote will deliver to this connection.
    pub struct Intents: u64 {
        const GUILDS = 1;
        const GUILD_MEMBERS = 1 << 1;
        const GUILD_MODERATION = 1 << 2;
        const GUILD_EMOJIS = 1 << 3;
        const GUILD_INTEGRATIONS = 1 << 4;
        const GUILD_WEBHOOKS = 1 << 5;
        const GUILD_INVITES = 1 << 6;
        const GUILD_VOICE_STATES = 1 << 7;
        const GUILD_PRESENCES = 1 << 8;
        const GUILD_MESSAGES = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const GUILD_MESSAGE_TYPING = 1 << 11;
        const DIRECT_MESSAGES = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        const MESSAGE_CONTENT = 1 << 15;
    }
}

impl Serialize for Intents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.bits())
    }
}

struct IntentsVisitor;

impl<'de> Visitor<'de> for IntentsVisitor {
    type Value = Intents;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("an intents bitmask")
    }

    fn visit_u64<E: DeError>(self, value: u64) -> Result<Self::Value, E> {
        // unknown bits are dropped; the mask evolves server-side
        Ok(Intents::from_bits_truncate(value))
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_u64(IntentsVisitor)
    }
}
