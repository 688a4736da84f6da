mod close_code;
mod envelope;
mod intents;
mod opcode;

pub mod event;
pub mod payload;

pub use self::{
    close_code::CloseCode,
    envelope::GatewayEnvelope,
    event::{Event, EventKind},
    intents::Intents,
    opcode::OpCode,
};
