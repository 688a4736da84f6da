/// Point-in-time sizes of the cache tables.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub guilds: usize,
    pub channels: usize,
    pub users: usize,
    pub members: usize,
    pub roles: usize,
    pub messages: usize,
    pub voice_states: usize,
    pub presences: usize,
    pub unavailable_guilds: usize,
}
