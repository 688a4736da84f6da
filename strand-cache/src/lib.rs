#[macro_use]
extern crate tracing;

mod cache;
mod stats;
mod update;

pub use self::{
    cache::InMemoryCache,
    stats::CacheStats,
    update::RemovedEntity,
};
