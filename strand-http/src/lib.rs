#[macro_use]
extern crate tracing;

mod client;
mod error;
mod route;

pub mod ratelimit;

pub use self::{
    client::{Client, ClientBuilder},
    error::HttpError,
    route::{BucketKey, Route},
};
