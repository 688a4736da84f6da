use std::fmt::{Display, Formatter, Result as FmtResult};

/// Close codes the remote attaches when it terminates a connection.
///
/// Classification drives the reconnect decision: most codes allow a resume,
/// a few kill the session but allow a fresh identify, and configuration
/// errors are fatal for the shard.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CloseCode {
    UnknownError,
    UnknownOpcode,
    DecodeError,
    NotAuthenticated,
    AuthenticationFailed,
    AlreadyAuthenticated,
    InvalidSequence,
    RateLimited,
    SessionTimedOut,
    InvalidShard,
    ShardingRequired,
    InvalidApiVersion,
    InvalidIntents,
    DisallowedIntents,
}

impl CloseCode {
    pub const fn from_u16(value: u16) -> Option<Self> {
        let code = match value {
            4000 => Self::UnknownError,
            4001 => Self::UnknownOpcode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4007 => Self::InvalidSequence,
            4008 => Self::RateLimited,
            4009 => Self::SessionTimedOut,
            4010 => Self::InvalidShard,
            4011 => Self::ShardingRequired,
            4012 => Self::InvalidApiVersion,
            4013 => Self::InvalidIntents,
            4014 => Self::DisallowedIntents,
            _ => return None,
        };

        Some(code)
    }

    pub const fn as_u16(self) -> u16 {
        match self {
            Self::UnknownError => 4000,
            Self::UnknownOpcode => 4001,
            Self::DecodeError => 4002,
            Self::NotAuthenticated => 4003,
            Self::AuthenticationFailed => 4004,
            Self::AlreadyAuthenticated => 4005,
            Self::InvalidSequence => 4007,
            Self::RateLimited => 4008,
            Self::SessionTimedOut => 4009,
            Self::InvalidShard => 4010,
            Self::ShardingRequired => 4011,
            Self::InvalidApiVersion => 4012,
            Self::InvalidIntents => 4013,
            Self::DisallowedIntents => 4014,
        }
    }

    /// Whether the shard must stop permanently instead of reconnecting.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    /// Whether the session survives the close, i.e. a resume may be sent on
    /// the next connection instead of a full identify.
    pub const fn session_survives(self) -> bool {
        !self.is_fatal() && !matches!(self, Self::InvalidSequence | Self::SessionTimedOut)
    }
}

impl Display for CloseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::UnknownError => "unknown error",
            Self::UnknownOpcode => "unknown opcode",
            Self::DecodeError => "decode error",
            Self::NotAuthenticated => "not authenticated",
            Self::AuthenticationFailed => "authentication failed",
            Self::AlreadyAuthenticated => "already authenticated",
            Self::InvalidSequence => "invalid sequence",
            Self::RateLimited => "rate limited",
            Self::SessionTimedOut => "session timed out",
            Self::InvalidShard => "invalid shard",
            Self::ShardingRequired => "sharding required",
            Self::InvalidApiVersion => "invalid api version",
            Self::InvalidIntents => "invalid intents",
            Self::DisallowedIntents => "disallowed intents",
        };

        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::CloseCode;

    #[test]
    fn configuration_errors_are_fatal() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(CloseCode::from_u16(code).unwrap().is_fatal(), "{code}");
        }
    }

    #[test]
    fn network_blips_keep_the_session() {
        assert!(CloseCode::UnknownError.session_survives());
        assert!(CloseCode::RateLimited.session_survives());
    }

    #[test]
    fn dead_sessions_require_identify() {
        assert!(!CloseCode::InvalidSequence.session_survives());
        assert!(!CloseCode::SessionTimedOut.session_survives());
        assert!(!CloseCode::InvalidSequence.is_fatal());
    }
}
