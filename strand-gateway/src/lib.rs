#[macro_use]
extern crate tracing;

mod cluster;
mod codec;
mod config;
mod error;
mod handler;
mod queue;
mod router;
mod session;
mod shard;

pub use self::{
    cluster::Cluster,
    config::{Config, ConfigBuilder, ShardScheme},
    error::{ClusterError, CodecError, ShardError},
    handler::{EventHandler, NoopEventHandler},
    router::EventRouter,
    shard::{Shard, ShardState},
};
