pub mod entity;
pub mod gateway;
pub mod id;
pub mod rest;

pub use self::{
    gateway::{CloseCode, Event, EventKind, GatewayEnvelope, Intents, OpCode},
    id::Id,
};
