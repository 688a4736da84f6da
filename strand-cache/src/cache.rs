use std::{collections::HashSet, sync::Arc};

use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use strand_model::{
    entity::{Channel, CurrentUser, Guild, Member, Message, Presence, Role, User, VoiceState},
    id::{
        marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker},
        Id,
    },
};

use crate::CacheStats;

/// Composite key for entities scoped to a user within a guild.
pub(crate) type GuildUserKey = (Id<GuildMarker>, Id<UserMarker>);

/// In-memory store of the latest known snapshot per entity.
///
/// One concurrent map per entity kind; the maps shard their locks per key,
/// so shards mutating unrelated entities never contend with each other.
/// All writes go through [`update`](Self::update) (event stream) or the
/// http client's optimistic inserts; reads hand out cheap `Arc` clones.
#[derive(Default)]
pub struct InMemoryCache {
    pub(crate) guilds: DashMap<Id<GuildMarker>, Arc<Guild>>,
    pub(crate) channels: DashMap<Id<ChannelMarker>, Arc<Channel>>,
    pub(crate) users: DashMap<Id<UserMarker>, Arc<User>>,
    pub(crate) members: DashMap<GuildUserKey, Arc<Member>>,
    pub(crate) roles: DashMap<Id<RoleMarker>, Arc<Role>>,
    pub(crate) messages: DashMap<Id<MessageMarker>, Arc<Message>>,
    pub(crate) voice_states: DashMap<GuildUserKey, Arc<VoiceState>>,
    pub(crate) presences: DashMap<GuildUserKey, Arc<Presence>>,
    pub(crate) unavailable_guilds: DashSet<Id<GuildMarker>>,
    pub(crate) current_user: RwLock<Option<Arc<CurrentUser>>>,

    // secondary indices, maintained alongside the primary tables
    pub(crate) guild_channels: DashMap<Id<GuildMarker>, HashSet<Id<ChannelMarker>>>,
    pub(crate) guild_roles: DashMap<Id<GuildMarker>, HashSet<Id<RoleMarker>>>,
    pub(crate) guild_members: DashMap<Id<GuildMarker>, HashSet<Id<UserMarker>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guild(&self, id: Id<GuildMarker>) -> Option<Arc<Guild>> {
        self.guilds.get(&id).map(|entry| Arc::clone(&entry))
    }

    pub fn channel(&self, id: Id<ChannelMarker>) -> Option<Arc<Channel>> {
        self.channels.get(&id).map(|entry| Arc::clone(&entry))
    }

    pub fn user(&self, id: Id<UserMarker>) -> Option<Arc<User>> {
        self.users.get(&id).map(|entry| Arc::clone(&entry))
    }

    pub fn member(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Option<Arc<Member>> {
        self.members
            .get(&(guild, user))
            .map(|entry| Arc::clone(&entry))
    }

    pub fn role(&self, id: Id<RoleMarker>) -> Option<Arc<Role>> {
        self.roles.get(&id).map(|entry| Arc::clone(&entry))
    }

    pub fn message(&self, id: Id<MessageMarker>) -> Option<Arc<Message>> {
        self.messages.get(&id).map(|entry| Arc::clone(&entry))
    }

    pub fn voice_state(
        &self,
        guild: Id<GuildMarker>,
        user: Id<UserMarker>,
    ) -> Option<Arc<VoiceState>> {
        self.voice_states
            .get(&(guild, user))
            .map(|entry| Arc::clone(&entry))
    }

    pub fn presence(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Option<Arc<Presence>> {
        self.presences
            .get(&(guild, user))
            .map(|entry| Arc::clone(&entry))
    }

    pub fn current_user(&self) -> Option<Arc<CurrentUser>> {
        self.current_user.read().clone()
    }

    pub fn is_guild_unavailable(&self, id: Id<GuildMarker>) -> bool {
        self.unavailable_guilds.contains(&id)
    }

    /// Ids of all cached channels of a guild.
    pub fn guild_channel_ids(&self, guild: Id<GuildMarker>) -> Vec<Id<ChannelMarker>> {
        self.guild_channels
            .get(&guild)
            .map(|entry| entry.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ids of all cached members of a guild.
    pub fn guild_member_ids(&self, guild: Id<GuildMarker>) -> Vec<Id<UserMarker>> {
        self.guild_members
            .get(&guild)
            .map(|entry| entry.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Resolve a channel within a guild by name through the secondary index.
    pub fn channel_by_name(&self, guild: Id<GuildMarker>, name: &str) -> Option<Arc<Channel>> {
        let ids = self.guild_channels.get(&guild)?;

        ids.iter().find_map(|id| {
            let channel = self.channel(*id)?;

            (channel.name.as_deref() == Some(name)).then_some(channel)
        })
    }

    /// Roles of a guild, resolved through the secondary index.
    pub fn guild_role_list(&self, guild: Id<GuildMarker>) -> Vec<Arc<Role>> {
        self.guild_roles
            .get(&guild)
            .map(|entry| entry.iter().filter_map(|id| self.role(*id)).collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            guilds: self.guilds.len(),
            channels: self.channels.len(),
            users: self.users.len(),
            members: self.members.len(),
            roles: self.roles.len(),
            messages: self.messages.len(),
            voice_states: self.voice_states.len(),
            presences: self.presences.len(),
            unavailable_guilds: self.unavailable_guilds.len(),
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.guilds.clear();
        self.channels.clear();
        self.users.clear();
        self.members.clear();
        self.roles.clear();
        self.messages.clear();
        self.voice_states.clear();
        self.presences.clear();
        self.unavailable_guilds.clear();
        self.guild_channels.clear();
        self.guild_roles.clear();
        self.guild_members.clear();
        *self.current_user.write() = None;
    }

    /// Drop all entities belonging to guilds handled by one shard.
    ///
    /// Used when that shard's session is invalidated; the replacement
    /// session replays the full initial state for exactly these guilds.
    pub fn clear_shard(&self, shard_id: u32, shard_count: u32) {
        debug_assert!(shard_count > 0);

        let guild_ids: Vec<_> = self
            .guilds
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| ((id.get() >> 22) % u64::from(shard_count)) == u64::from(shard_id))
            .collect();

        debug!(
            shard_id,
            guilds = guild_ids.len(),
            "Clearing cache slice after session loss"
        );

        for id in guild_ids {
            self.remove_guild_tree(id);
        }

        self.unavailable_guilds.retain(|id| {
            ((id.get() >> 22) % u64::from(shard_count)) != u64::from(shard_id)
        });
    }

    /// Remove a guild and every entity scoped to it, returning the guild's
    /// last snapshot.
    pub(crate) fn remove_guild_tree(&self, id: Id<GuildMarker>) -> Option<Arc<Guild>> {
        if let Some((_, channel_ids)) = self.guild_channels.remove(&id) {
            for channel_id in channel_ids {
                self.channels.remove(&channel_id);
            }
        }

        if let Some((_, role_ids)) = self.guild_roles.remove(&id) {
            for role_id in role_ids {
                self.roles.remove(&role_id);
            }
        }

        if let Some((_, user_ids)) = self.guild_members.remove(&id) {
            for user_id in user_ids {
                self.members.remove(&(id, user_id));
            }
        }

        self.messages.retain(|_, message| message.guild_id != Some(id));
        self.voice_states.retain(|(guild, _), _| *guild != id);
        self.presences.retain(|(guild, _), _| *guild != id);
        self.unavailable_guilds.remove(&id);

        self.guilds.remove(&id).map(|(_, guild)| guild)
    }
}
