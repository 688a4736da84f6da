use serde::Deserialize;
use serde_json::value::RawValue;

use super::OpCode;

/// The frame envelope every inbound gateway message arrives in.
///
/// The payload stays raw until the router (or the shard, for control ops)
/// picks a typed deserialization based on `op` and `t`.
#[derive(Debug, Deserialize)]
pub struct GatewayEnvelope {
    pub op: OpCode,
    #[serde(default)]
    pub d: Option<Box<RawValue>>,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::GatewayEnvelope;
    use crate::gateway::OpCode;

    #[test]
    fn dispatch_envelope_keeps_payload_raw() {
        let raw = r#"{"op":0,"s":42,"t":"MESSAGE_CREATE","d":{"id":"1"}}"#;
        let envelope: GatewayEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(envelope.op, OpCode::Dispatch);
        assert_eq!(envelope.s, Some(42));
        assert_eq!(envelope.t.as_deref(), Some("MESSAGE_CREATE"));
        assert_eq!(envelope.d.unwrap().get(), r#"{"id":"1"}"#);
    }

    #[test]
    fn control_envelope_tolerates_null_fields() {
        let raw = r#"{"op":11,"d":null,"s":null,"t":null}"#;
        let envelope: GatewayEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(envelope.op, OpCode::HeartbeatAck);
        assert!(envelope.s.is_none());
        assert!(envelope.t.is_none());
    }
}
