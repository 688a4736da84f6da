use std::sync::Arc;

use dashmap::DashMap;
use strand_cache::InMemoryCache;
use strand_http::Client;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config::{Config, ShardScheme},
    queue::IdentifyQueue,
    router::EventRouter,
    shard::{Shard, ShardState},
    ClusterError, EventHandler,
};

/// Orchestrates the shards of one process.
///
/// Resolves the shard topology from the session-start metadata (or the
/// configured range), hands every shard the shared identify queue, router
/// and state table, and supervises their tasks until shutdown.
pub struct Cluster {
    config: Arc<Config>,
    gateway_url: Box<str>,
    shard_ids: Vec<u32>,
    total: u32,
    router: Arc<EventRouter>,
    queue: Arc<IdentifyQueue>,
    states: Arc<DashMap<u32, ShardState>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Cluster {
    /// Resolve the topology and prepare shards; none connect until [`up`].
    ///
    /// [`up`]: Self::up
    pub async fn new(
        config: Config,
        http: &Client,
        cache: Arc<InMemoryCache>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Self, ClusterError> {
        let (shard_ids, total, recommended_url) = match config.scheme() {
            ShardScheme::Auto => {
                let info = http
                    .gateway_bot()
                    .await
                    .map_err(ClusterError::StartMetadata)?;

                info!(
                    shards = info.shards,
                    remaining_starts = info.session_start_limit.remaining,
                    "Using recommended shard count"
                );

                ((0..info.shards).collect::<Vec<_>>(), info.shards, Some(info.url))
            }
            ShardScheme::Range { from, to, total } => {
                if from > to || to >= total {
                    return Err(ClusterError::InvalidShardRange);
                }

                ((from..=to).collect(), total, None)
            }
        };

        let gateway_url = match (&config.gateway_url, recommended_url) {
            (Some(url), _) => url.clone(),
            (None, Some(url)) => url.into_boxed_str(),
            (None, None) => {
                // a fixed range still needs an address from the metadata call
                let info = http
                    .gateway_bot()
                    .await
                    .map_err(ClusterError::StartMetadata)?;

                info.url.into_boxed_str()
            }
        };

        let config = Arc::new(config);
        let states = Arc::new(DashMap::new());

        for id in shard_ids.iter().copied() {
            states.insert(id, ShardState::Disconnected);
        }

        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            queue: Arc::new(IdentifyQueue::new(config.identify_window)),
            config,
            gateway_url,
            shard_ids,
            total,
            router: Arc::new(EventRouter::new(cache, handler)),
            states,
            shutdown,
            tasks: Vec::new(),
        })
    }

    pub fn shard_ids(&self) -> &[u32] {
        &self.shard_ids
    }

    pub fn total_shards(&self) -> u32 {
        self.total
    }

    pub fn cache(&self) -> &Arc<InMemoryCache> {
        self.router.cache()
    }

    pub fn shard_state(&self, shard_id: u32) -> Option<ShardState> {
        self.states.get(&shard_id).map(|state| *state.value())
    }

    pub fn ready_shards(&self) -> usize {
        self.states
            .iter()
            .filter(|entry| *entry.value() == ShardState::Ready)
            .count()
    }

    pub fn all_ready(&self) -> bool {
        self.ready_shards() == self.shard_ids.len()
    }

    /// Spawn one task per shard. Identify pacing is enforced by the shared
    /// queue, so bringing every shard up at once is fine.
    pub fn up(&mut self) {
        for id in self.shard_ids.iter().copied() {
            let shard = Shard::new(
                id,
                self.total,
                self.gateway_url.clone(),
                Arc::clone(&self.config),
                Arc::clone(&self.router),
                Arc::clone(&self.queue),
                Arc::clone(&self.states),
                self.shutdown.subscribe(),
            );

            let router = Arc::clone(&self.router);

            self.tasks.push(tokio::spawn(async move {
                if let Err(err) = shard.run().await {
                    error!(shard = id, %err, "Shard stopped permanently");
                    router.handler().shard_fatal(id, &err).await;
                }
            }));
        }
    }

    /// Signal every shard to stop and wait for their tasks to finish.
    pub async fn down(&mut self) {
        // receivers observe the change at their next select point
        let _ = self.shutdown.send(true);

        for task in self.tasks.drain(..) {
            let _ = task.await;
        }

        info!("Cluster is down");
    }
}
