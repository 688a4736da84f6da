use std::sync::Arc;

use serde_json::value::RawValue;
use strand_cache::{InMemoryCache, RemovedEntity};
use strand_model::Event;

use crate::EventHandler;

/// Maps an inbound dispatch frame to its cache mutation and callback.
///
/// One instance is shared read-only across all shards. Routing is
/// synchronous with respect to the delivering shard: the shard awaits the
/// returned future, so events of one shard are delivered strictly in
/// arrival order while different shards proceed concurrently.
pub struct EventRouter {
    cache: Arc<InMemoryCache>,
    handler: Arc<dyn EventHandler>,
}

impl EventRouter {
    pub fn new(cache: Arc<InMemoryCache>, handler: Arc<dyn EventHandler>) -> Self {
        Self { cache, handler }
    }

    pub fn cache(&self) -> &Arc<InMemoryCache> {
        &self.cache
    }

    pub(crate) fn handler(&self) -> &dyn EventHandler {
        &*self.handler
    }

    /// Route one dispatch frame: deserialize, mutate the cache, then invoke
    /// the callback so it observes post-mutation state.
    ///
    /// Unrecognized tags are dropped silently; a payload of a recognized
    /// tag that fails to deserialize only costs that one event.
    pub async fn route(&self, shard_id: u32, tag: &str, d: Option<&RawValue>) {
        let event = match Event::parse(tag, d) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!(shard_id, tag, "Ignoring unrecognized event");

                return;
            }
            Err(err) => {
                warn!(shard_id, tag, %err, "Dropping undeserializable event");

                return;
            }
        };

        trace!(shard_id, kind = ?event.kind(), "Routing event");

        // mutation first; the callback must see the post-event cache
        let removed = self.cache.update(&event);
        let handler = self.handler();

        match event {
            Event::Ready(ready) => handler.ready(shard_id, *ready).await,
            Event::Resumed => handler.resumed(shard_id).await,
            Event::GuildCreate(guild) => handler.guild_create(shard_id, *guild).await,
            Event::GuildUpdate(guild) => handler.guild_update(shard_id, *guild).await,
            Event::GuildDelete(event) => {
                let prior = match removed {
                    Some(RemovedEntity::Guild(guild)) => Some(guild),
                    _ => None,
                };

                handler.guild_delete(shard_id, event, prior).await;
            }
            Event::ChannelCreate(channel) => handler.channel_create(shard_id, *channel).await,
            Event::ChannelUpdate(channel) => handler.channel_update(shard_id, *channel).await,
            Event::ChannelDelete(channel) => {
                let prior = match removed {
                    Some(RemovedEntity::Channel(channel)) => Some(channel),
                    _ => None,
                };

                handler.channel_delete(shard_id, *channel, prior).await;
            }
            Event::MessageCreate(message) => handler.message_create(shard_id, *message).await,
            Event::MessageUpdate(update) => handler.message_update(shard_id, *update).await,
            Event::MessageDelete(event) => {
                let prior = match removed {
                    Some(RemovedEntity::Message(message)) => Some(message),
                    _ => None,
                };

                handler.message_delete(shard_id, event, prior).await;
            }
            Event::MemberAdd(member) => handler.member_add(shard_id, *member).await,
            Event::MemberUpdate(member) => handler.member_update(shard_id, *member).await,
            Event::MemberRemove(event) => {
                let prior = match removed {
                    Some(RemovedEntity::Member(member)) => Some(member),
                    _ => None,
                };

                handler.member_remove(shard_id, event, prior).await;
            }
            Event::RoleCreate(event) => handler.role_create(shard_id, event).await,
            Event::RoleUpdate(event) => handler.role_update(shard_id, event).await,
            Event::RoleDelete(event) => {
                let prior = match removed {
                    Some(RemovedEntity::Role(role)) => Some(role),
                    _ => None,
                };

                handler.role_delete(shard_id, event, prior).await;
            }
            Event::PresenceUpdate(presence) => handler.presence_update(shard_id, *presence).await,
            Event::VoiceStateUpdate(state) => handler.voice_state_update(shard_id, *state).await,
            Event::VoiceServerUpdate(update) => {
                handler.voice_server_update(shard_id, update).await
            }
            Event::UserUpdate(user) => handler.user_update(shard_id, *user).await,
            Event::TypingStart(event) => handler.typing_start(shard_id, event).await,
        }
    }
}
