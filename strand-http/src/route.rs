use std::fmt::{Display, Formatter, Result as FmtResult};

use http::Method;
use strand_model::id::{
    marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker},
    Id,
};

/// A REST call with its path parameters resolved.
#[derive(Clone, Debug)]
pub enum Route {
    GetGateway,
    GetGatewayBot,
    GetCurrentUser,
    GetChannel {
        channel_id: Id<ChannelMarker>,
    },
    ModifyChannel {
        channel_id: Id<ChannelMarker>,
    },
    DeleteChannel {
        channel_id: Id<ChannelMarker>,
    },
    CreateMessage {
        channel_id: Id<ChannelMarker>,
    },
    DeleteMessage {
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    },
    GetGuild {
        guild_id: Id<GuildMarker>,
    },
    ModifyGuild {
        guild_id: Id<GuildMarker>,
    },
    GetGuildChannels {
        guild_id: Id<GuildMarker>,
    },
    CreateChannel {
        guild_id: Id<GuildMarker>,
    },
    GetMember {
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    },
    RemoveMember {
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    },
    CreateRole {
        guild_id: Id<GuildMarker>,
    },
    DeleteRole {
        guild_id: Id<GuildMarker>,
        role_id: Id<RoleMarker>,
    },
}

impl Route {
    pub fn method(&self) -> Method {
        match self {
            Self::GetGateway
            | Self::GetGatewayBot
            | Self::GetCurrentUser
            | Self::GetChannel { .. }
            | Self::GetGuild { .. }
            | Self::GetGuildChannels { .. }
            | Self::GetMember { .. } => Method::GET,
            Self::CreateMessage { .. } | Self::CreateChannel { .. } | Self::CreateRole { .. } => {
                Method::POST
            }
            Self::ModifyChannel { .. } | Self::ModifyGuild { .. } => Method::PATCH,
            Self::DeleteChannel { .. }
            | Self::DeleteMessage { .. }
            | Self::RemoveMember { .. }
            | Self::DeleteRole { .. } => Method::DELETE,
        }
    }

    /// Rate limit bucket this call draws from: the route template plus its
    /// major parameter. Minor parameters (message id, user id, role id)
    /// share the template's bucket.
    pub fn bucket_key(&self) -> BucketKey {
        match self {
            Self::GetGateway => BucketKey::new("gateway", 0),
            Self::GetGatewayBot => BucketKey::new("gateway/bot", 0),
            Self::GetCurrentUser => BucketKey::new("users/@me", 0),
            Self::GetChannel { channel_id }
            | Self::ModifyChannel { channel_id }
            | Self::DeleteChannel { channel_id } => {
                BucketKey::new("channels/{}", channel_id.get())
            }
            Self::CreateMessage { channel_id } => {
                BucketKey::new("channels/{}/messages", channel_id.get())
            }
            Self::DeleteMessage { channel_id, .. } => {
                BucketKey::new("channels/{}/messages/{message}", channel_id.get())
            }
            Self::GetGuild { guild_id } | Self::ModifyGuild { guild_id } => {
                BucketKey::new("guilds/{}", guild_id.get())
            }
            Self::GetGuildChannels { guild_id } | Self::CreateChannel { guild_id } => {
                BucketKey::new("guilds/{}/channels", guild_id.get())
            }
            Self::GetMember { guild_id, .. } | Self::RemoveMember { guild_id, .. } => {
                BucketKey::new("guilds/{}/members/{user}", guild_id.get())
            }
            Self::CreateRole { guild_id } | Self::DeleteRole { guild_id, .. } => {
                BucketKey::new("guilds/{}/roles", guild_id.get())
            }
        }
    }
}

impl Display for Route {
    /// Path relative to the API base, leading slash included.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::GetGateway => f.write_str("/gateway"),
            Self::GetGatewayBot => f.write_str("/gateway/bot"),
            Self::GetCurrentUser => f.write_str("/users/@me"),
            Self::GetChannel { channel_id }
            | Self::ModifyChannel { channel_id }
            | Self::DeleteChannel { channel_id } => write!(f, "/channels/{channel_id}"),
            Self::CreateMessage { channel_id } => write!(f, "/channels/{channel_id}/messages"),
            Self::DeleteMessage {
                channel_id,
                message_id,
            } => write!(f, "/channels/{channel_id}/messages/{message_id}"),
            Self::GetGuild { guild_id } | Self::ModifyGuild { guild_id } => {
                write!(f, "/guilds/{guild_id}")
            }
            Self::GetGuildChannels { guild_id } | Self::CreateChannel { guild_id } => {
                write!(f, "/guilds/{guild_id}/channels")
            }
            Self::GetMember { guild_id, user_id } | Self::RemoveMember { guild_id, user_id } => {
                write!(f, "/guilds/{guild_id}/members/{user_id}")
            }
            Self::CreateRole { guild_id } => write!(f, "/guilds/{guild_id}/roles"),
            Self::DeleteRole { guild_id, role_id } => {
                write!(f, "/guilds/{guild_id}/roles/{role_id}")
            }
        }
    }
}

/// Identity of a rate limit bucket: route template + major parameter.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BucketKey {
    template: &'static str,
    major: u64,
}

impl BucketKey {
    const fn new(template: &'static str, major: u64) -> Self {
        Self { template, major }
    }
}

impl Display for BucketKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.template, self.major)
    }
}

#[cfg(test)]
mod tests {
    use strand_model::id::Id;

    use super::Route;

    #[test]
    fn minor_params_share_a_bucket() {
        let a = Route::DeleteMessage {
            channel_id: Id::new(1),
            message_id: Id::new(10),
        };
        let b = Route::DeleteMessage {
            channel_id: Id::new(1),
            message_id: Id::new(20),
        };

        assert_eq!(a.bucket_key(), b.bucket_key());
    }

    #[test]
    fn major_params_split_buckets() {
        let a = Route::CreateMessage {
            channel_id: Id::new(1),
        };
        let b = Route::CreateMessage {
            channel_id: Id::new(2),
        };

        assert_ne!(a.bucket_key(), b.bucket_key());
    }

    #[test]
    fn different_templates_split_buckets() {
        let a = Route::GetChannel {
            channel_id: Id::new(1),
        };
        let b = Route::CreateMessage {
            channel_id: Id::new(1),
        };

        assert_ne!(a.bucket_key(), b.bucket_key());
    }
}
