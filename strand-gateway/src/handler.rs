use std::sync::Arc;

use async_trait::async_trait;
use strand_model::{
    entity::{Channel, Guild, Member, Message, Presence, Role, User, VoiceState},
    gateway::{
        event::{
            GuildDelete, MemberRemove, MessageDelete, MessageUpdate, RoleCreate, RoleDelete,
            RoleUpdate, TypingStart, VoiceServerUpdate,
        },
        payload::Ready,
    },
};

use crate::ShardError;

/// Application callbacks, one per event kind plus shard lifecycle.
///
/// Every method defaults to a no-op; implement the ones you care about.
/// Callbacks run on the delivering shard's task, strictly in frame arrival
/// order for that shard, and always observe post-mutation cache state.
/// Deletion callbacks additionally receive the entity's last snapshot,
/// which the cache no longer holds at that point.
#[allow(unused_variables)]
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn ready(&self, shard_id: u32, ready: Ready) {}

    async fn resumed(&self, shard_id: u32) {}

    async fn guild_create(&self, shard_id: u32, guild: Guild) {}

    async fn guild_update(&self, shard_id: u32, guild: Guild) {}

    async fn guild_delete(&self, shard_id: u32, event: GuildDelete, prior: Option<Arc<Guild>>) {}

    async fn channel_create(&self, shard_id: u32, channel: Channel) {}

    async fn channel_update(&self, shard_id: u32, channel: Channel) {}

    async fn channel_delete(&self, shard_id: u32, channel: Channel, prior: Option<Arc<Channel>>) {}

    async fn message_create(&self, shard_id: u32, message: Message) {}

    async fn message_update(&self, shard_id: u32, update: MessageUpdate) {}

    async fn message_delete(
        &self,
        shard_id: u32,
        event: MessageDelete,
        prior: Option<Arc<Message>>,
    ) {
    }

    async fn member_add(&self, shard_id: u32, member: Member) {}

    async fn member_update(&self, shard_id: u32, member: Member) {}

    async fn member_remove(&self, shard_id: u32, event: MemberRemove, prior: Option<Arc<Member>>) {}

    async fn role_create(&self, shard_id: u32, event: RoleCreate) {}

    async fn role_update(&self, shard_id: u32, event: RoleUpdate) {}

    async fn role_delete(&self, shard_id: u32, event: RoleDelete, prior: Option<Arc<Role>>) {}

    async fn presence_update(&self, shard_id: u32, presence: Presence) {}

    async fn voice_state_update(&self, shard_id: u32, state: VoiceState) {}

    /// Hand-off to the media transport: token and endpoint for a voice
    /// session. Everything past this boundary is the transport's business.
    async fn voice_server_update(&self, shard_id: u32, update: VoiceServerUpdate) {}

    async fn user_update(&self, shard_id: u32, user: User) {}

    async fn typing_start(&self, shard_id: u32, event: TypingStart) {}

    // shard lifecycle

    async fn shard_connecting(&self, shard_id: u32) {}

    async fn shard_ready(&self, shard_id: u32) {}

    async fn shard_resumed(&self, shard_id: u32) {}

    async fn shard_disconnected(&self, shard_id: u32) {}

    /// The shard's session was invalidated; its slice of the cache has
    /// already been wiped. Caches outside this library should reset too.
    async fn session_invalidated(&self, shard_id: u32) {}

    /// The shard hit a configuration-level error and stopped permanently.
    async fn shard_fatal(&self, shard_id: u32, error: &ShardError) {}
}

/// No callbacks at all; useful when only the cache output matters.
pub struct NoopEventHandler;

#[async_trait]
impl EventHandler for NoopEventHandler {}
