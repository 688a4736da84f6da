use std::time::Duration;

use strand_model::{gateway::payload::UpdatePresencePayload, Intents};

/// Which slice of the shard space this process drives.
#[derive(Copy, Clone, Debug)]
pub enum ShardScheme {
    /// Ask the remote for its recommended count and run all of it.
    Auto,
    /// Run shards `from..=to` out of `total`.
    Range { from: u32, to: u32, total: u32 },
}

/// Connection-level configuration, built once and shared read-only by every
/// shard.
#[derive(Debug)]
pub struct Config {
    pub(crate) token: Box<str>,
    pub(crate) intents: Intents,
    pub(crate) scheme: ShardScheme,
    pub(crate) presence: Option<UpdatePresencePayload>,
    /// Overrides the address from the session-start metadata call.
    pub(crate) gateway_url: Option<Box<str>>,
    pub(crate) large_threshold: u64,
    pub(crate) compression: bool,
    pub(crate) backoff_base: Duration,
    pub(crate) backoff_cap: Duration,
    /// Rolling window within which at most one identify may happen.
    pub(crate) identify_window: Duration,
    /// Budget for connect + hello before the attempt counts as failed.
    pub(crate) handshake_timeout: Duration,
}

impl Config {
    pub fn builder(token: impl Into<String>, intents: Intents) -> ConfigBuilder {
        ConfigBuilder::new(token, intents)
    }

    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        ConfigBuilder::new(token, intents).build()
    }

    pub fn intents(&self) -> Intents {
        self.intents
    }

    pub fn scheme(&self) -> ShardScheme {
        self.scheme
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            config: Config {
                token: token.into().into_boxed_str(),
                intents,
                scheme: ShardScheme::Auto,
                presence: None,
                gateway_url: None,
                large_threshold: 250,
                compression: false,
                backoff_base: Duration::from_secs(1),
                backoff_cap: Duration::from_secs(64),
                identify_window: Duration::from_secs(5),
                handshake_timeout: Duration::from_secs(30),
            },
        }
    }

    pub fn scheme(mut self, scheme: ShardScheme) -> Self {
        self.config.scheme = scheme;
        self
    }

    pub fn presence(mut self, presence: UpdatePresencePayload) -> Self {
        self.config.presence = Some(presence);
        self
    }

    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.config.gateway_url = Some(url.into().into_boxed_str());
        self
    }

    pub fn large_threshold(mut self, large_threshold: u64) -> Self {
        self.config.large_threshold = large_threshold;
        self
    }

    /// Enable zlib-stream transport compression.
    pub fn compression(mut self, compression: bool) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.config.backoff_base = base;
        self.config.backoff_cap = cap;
        self
    }

    pub fn identify_window(mut self, window: Duration) -> Self {
        self.config.identify_window = window;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
