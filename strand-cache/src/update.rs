use std::{mem, sync::Arc};

use strand_model::{
    entity::{Channel, Guild, Member, Message, Presence, Role, VoiceState},
    id::{marker::GuildMarker, Id},
    Event,
};

use crate::InMemoryCache;

/// Pre-deletion snapshot captured while applying a delete event.
///
/// The cache no longer holds the entity by the time callbacks run; this is
/// how they still get to see what was deleted.
#[derive(Clone, Debug)]
pub enum RemovedEntity {
    Guild(Arc<Guild>),
    Channel(Arc<Channel>),
    Member(Arc<Member>),
    Role(Arc<Role>),
    Message(Arc<Message>),
}

impl InMemoryCache {
    /// Apply the cache mutation of one event.
    ///
    /// Create events insert, update events merge over the existing snapshot
    /// or insert, delete events remove and return the prior snapshot. The
    /// last writer in frame arrival order wins; applying the same create
    /// twice is a no-op for the resulting state.
    pub fn update(&self, event: &Event) -> Option<RemovedEntity> {
        match event {
            Event::Ready(ready) => {
                *self.current_user.write() = Some(Arc::new(ready.user.clone()));

                for guild in &ready.guilds {
                    self.unavailable_guilds.insert(guild.id);
                }
            }
            Event::GuildCreate(guild) => self.insert_guild((**guild).clone()),
            Event::GuildUpdate(guild) => {
                let merged = match self.guilds.get(&guild.id) {
                    Some(existing) => {
                        let mut merged = (**guild).clone();

                        // nested collections live in their own tables and
                        // are absent on updates; keep what the create left
                        merged.channels = existing.channels.clone();
                        merged.members = existing.members.clone();
                        merged.roles = existing.roles.clone();
                        merged.voice_states = existing.voice_states.clone();
                        merged.presences = existing.presences.clone();

                        merged
                    }
                    None => (**guild).clone(),
                };

                self.guilds.insert(merged.id, Arc::new(merged));
            }
            Event::GuildDelete(del) => {
                let removed = self.remove_guild_tree(del.id);

                if del.unavailable {
                    self.unavailable_guilds.insert(del.id);
                }

                return removed.map(RemovedEntity::Guild);
            }
            Event::ChannelCreate(channel) | Event::ChannelUpdate(channel) => {
                self.insert_channel((**channel).clone());
            }
            Event::ChannelDelete(channel) => {
                if let Some(guild_id) = channel.guild_id {
                    if let Some(mut ids) = self.guild_channels.get_mut(&guild_id) {
                        ids.remove(&channel.id);
                    }
                }

                let removed = self.channels.remove(&channel.id).map(|(_, prior)| prior);

                return removed.map(RemovedEntity::Channel);
            }
            Event::MessageCreate(message) => {
                self.users
                    .insert(message.author.id, Arc::new(message.author.clone()));
                self.messages
                    .insert(message.id, Arc::new((**message).clone()));
            }
            Event::MessageUpdate(update) => {
                if let Some(existing) = self.messages.get(&update.id).map(|e| Arc::clone(&e)) {
                    let mut merged = (*existing).clone();

                    if let Some(ref content) = update.content {
                        merged.content = content.clone();
                    }

                    if let Some(ref author) = update.author {
                        merged.author = author.clone();
                    }

                    merged.edited_timestamp = update.edited_timestamp.clone();

                    self.messages.insert(merged.id, Arc::new(merged));
                }
            }
            Event::MessageDelete(del) => {
                let removed = self.messages.remove(&del.id).map(|(_, prior)| prior);

                return removed.map(RemovedEntity::Message);
            }
            Event::MemberAdd(member) | Event::MemberUpdate(member) => {
                let Some(guild_id) = member.guild_id else {
                    return None;
                };

                self.insert_member(guild_id, (**member).clone());
            }
            Event::MemberRemove(remove) => {
                let key = (remove.guild_id, remove.user.id);

                if let Some(mut ids) = self.guild_members.get_mut(&remove.guild_id) {
                    ids.remove(&remove.user.id);
                }

                let removed = self.members.remove(&key).map(|(_, prior)| prior);

                return removed.map(RemovedEntity::Member);
            }
            Event::RoleCreate(create) => {
                self.insert_role(create.guild_id, create.role.clone());
            }
            Event::RoleUpdate(update) => {
                self.insert_role(update.guild_id, update.role.clone());
            }
            Event::RoleDelete(del) => {
                if let Some(mut ids) = self.guild_roles.get_mut(&del.guild_id) {
                    ids.remove(&del.role_id);
                }

                let removed = self.roles.remove(&del.role_id).map(|(_, prior)| prior);

                return removed.map(RemovedEntity::Role);
            }
            Event::PresenceUpdate(presence) => {
                let Some(guild_id) = presence.guild_id else {
                    return None;
                };

                self.presences.insert(
                    (guild_id, presence.user.id),
                    Arc::new((**presence).clone()),
                );
            }
            Event::VoiceStateUpdate(state) => {
                let Some(guild_id) = state.guild_id else {
                    return None;
                };

                let key = (guild_id, state.user_id);

                // a null channel means the user disconnected from voice
                if state.channel_id.is_some() {
                    self.voice_states.insert(key, Arc::new((**state).clone()));
                } else {
                    self.voice_states.remove(&key);
                }
            }
            Event::UserUpdate(user) => {
                self.users.insert(user.id, Arc::new((**user).clone()));
            }
            Event::Resumed
            | Event::VoiceServerUpdate(_)
            | Event::TypingStart(_) => {}
        }

        None
    }

    /// Insert a full guild snapshot, splitting its nested collections into
    /// their per-kind tables.
    fn insert_guild(&self, mut guild: Guild) {
        let guild_id = guild.id;

        for mut channel in mem::take(&mut guild.channels) {
            channel.guild_id = Some(guild_id);
            self.insert_channel(channel);
        }

        for member in mem::take(&mut guild.members) {
            self.insert_member(guild_id, member);
        }

        for role in mem::take(&mut guild.roles) {
            self.insert_role(guild_id, role);
        }

        for mut state in mem::take(&mut guild.voice_states) {
            state.guild_id = Some(guild_id);

            if state.channel_id.is_some() {
                self.voice_states
                    .insert((guild_id, state.user_id), Arc::new(state));
            }
        }

        for mut presence in mem::take(&mut guild.presences) {
            presence.guild_id = Some(guild_id);
            self.presences
                .insert((guild_id, presence.user.id), Arc::new(presence));
        }

        self.unavailable_guilds.remove(&guild_id);
        self.guilds.insert(guild_id, Arc::new(guild));
    }

    fn insert_channel(&self, channel: Channel) {
        if let Some(guild_id) = channel.guild_id {
            self.guild_channels
                .entry(guild_id)
                .or_default()
                .insert(channel.id);
        }

        self.channels.insert(channel.id, Arc::new(channel));
    }

    fn insert_member(&self, guild_id: Id<GuildMarker>, mut member: Member) {
        member.guild_id = Some(guild_id);

        self.guild_members
            .entry(guild_id)
            .or_default()
            .insert(member.user.id);

        self.users
            .insert(member.user.id, Arc::new(member.user.clone()));
        self.members
            .insert((guild_id, member.user.id), Arc::new(member));
    }

    fn insert_role(&self, guild_id: Id<GuildMarker>, role: Role) {
        self.guild_roles
            .entry(guild_id)
            .or_default()
            .insert(role.id);

        self.roles.insert(role.id, Arc::new(role));
    }
}
