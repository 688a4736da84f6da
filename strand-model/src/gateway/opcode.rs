use std::fmt::{Formatter, Result as FmtResult};

use serde::{
    de::{Error as DeError, Unexpected, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OpCode {
    /// An event, sequenced and tagged with its kind.
    Dispatch,
    /// Keep-alive, sent periodically or on request.
    Heartbeat,
    Identify,
    PresenceUpdate,
    VoiceStateUpdate,
    Resume,
    /// The remote asks for a reconnect; the session stays resumable.
    Reconnect,
    RequestGuildMembers,
    /// The session is gone; the payload says whether a resume may work.
    InvalidSession,
    /// First frame after connecting, carries the heartbeat interval.
    Hello,
    HeartbeatAck,
}

impl OpCode {
    pub const fn from_u8(value: u8) -> Option<Self> {
        let op = match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::PresenceUpdate,
            4 => Self::VoiceStateUpdate,
            6 => Self::Resume,
            7 => Self::Reconnect,
            8 => Self::RequestGuildMembers,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        };

        Some(op)
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::PresenceUpdate => 3,
            Self::VoiceStateUpdate => 4,
            Self::Resume => 6,
            Self::Reconnect => 7,
            Self::RequestGuildMembers => 8,
            Self::InvalidSession => 9,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

struct OpCodeVisitor;

impl<'de> Visitor<'de> for OpCodeVisitor {
    type Value = OpCode;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("a known gateway opcode")
    }

    fn visit_u64<E: DeError>(self, value: u64) -> Result<Self::Value, E> {
        u8::try_from(value)
            .ok()
            .and_then(OpCode::from_u8)
            .ok_or_else(|| DeError::invalid_value(Unexpected::Unsigned(value), &self))
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_u64(OpCodeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::OpCode;

    #[test]
    fn roundtrips_all_known_opcodes() {
        for value in 0..=11u8 {
            // 5 is unassigned by the protocol
            if value == 5 {
                assert!(OpCode::from_u8(value).is_none());
                continue;
            }

            let op = OpCode::from_u8(value).unwrap();
            assert_eq!(op.as_u8(), value);
        }
    }
}
