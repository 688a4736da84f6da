//! Translation between transport frames and gateway JSON payloads.
//!
//! Text frames pass through as-is. When zlib-stream compression is enabled
//! the remote sends binary frames sharing one compression context for the
//! whole connection; a payload is complete once the flush suffix arrives.

use std::mem;

use flate2::{Decompress, FlushDecompress, Status};
use serde::Serialize;
use tokio_tungstenite::tungstenite::Message;

use crate::CodecError;

const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xff, 0xff];
const INFLATE_CHUNK: usize = 16 * 1024;

/// A transport frame after decoding.
pub(crate) enum Decoded {
    /// A complete JSON payload.
    Payload(String),
    /// The remote closed the connection, possibly with a code.
    Close(Option<u16>),
    /// Control frame or partial compressed payload; nothing to route.
    Nothing,
}

pub(crate) fn encode<T: Serialize>(payload: &T) -> Message {
    // outbound payload types cannot fail to serialize
    let json = serde_json::to_string(payload).expect("payload serialization failed");

    Message::Text(json)
}

pub(crate) fn decode(
    message: Message,
    inflater: Option<&mut Inflater>,
) -> Result<Decoded, CodecError> {
    match message {
        Message::Text(text) => Ok(Decoded::Payload(text)),
        Message::Binary(bytes) => match inflater {
            Some(inflater) => match inflater.extend(&bytes)? {
                Some(text) => Ok(Decoded::Payload(text)),
                None => Ok(Decoded::Nothing),
            },
            None => Err(CodecError::UnexpectedBinary),
        },
        Message::Close(frame) => Ok(Decoded::Close(frame.map(|frame| frame.code.into()))),
        // ping/pong are answered by the transport layer itself
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(Decoded::Nothing),
    }
}

/// Stateful zlib-stream decompressor, one per connection.
pub(crate) struct Inflater {
    decompress: Decompress,
    compressed: Vec<u8>,
    buffer: Vec<u8>,
}

impl Inflater {
    pub(crate) fn new() -> Self {
        Self {
            decompress: Decompress::new(true),
            compressed: Vec::new(),
            buffer: Vec::new(),
        }
    }

    /// Feed one binary frame; returns the payload once its final frame
    /// (marked by the flush suffix) has arrived.
    fn extend(&mut self, bytes: &[u8]) -> Result<Option<String>, CodecError> {
        self.compressed.extend_from_slice(bytes);

        if !self.compressed.ends_with(&ZLIB_SUFFIX) {
            return Ok(None);
        }

        let mut offset = 0;

        loop {
            self.buffer.reserve(INFLATE_CHUNK);

            let in_before = self.decompress.total_in();
            let out_before = self.decompress.total_out();

            let status = self.decompress.decompress_vec(
                &self.compressed[offset..],
                &mut self.buffer,
                FlushDecompress::Sync,
            )?;

            offset += (self.decompress.total_in() - in_before) as usize;
            let produced = self.decompress.total_out() - out_before;

            if offset >= self.compressed.len() {
                break;
            }

            if produced == 0 || matches!(status, Status::StreamEnd) {
                break;
            }
        }

        self.compressed.clear();

        let payload = String::from_utf8(mem::take(&mut self.buffer))?;

        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use flate2::{Compress, Compression, FlushCompress};
    use tokio_tungstenite::tungstenite::Message;

    use super::{decode, Decoded, Inflater, ZLIB_SUFFIX};

    fn deflate(input: &[u8]) -> Vec<u8> {
        let mut compress = Compress::new(Compression::default(), true);
        let mut out = Vec::with_capacity(input.len() + 64);

        compress
            .compress_vec(input, &mut out, FlushCompress::Sync)
            .unwrap();

        out
    }

    #[test]
    fn text_frames_pass_through() {
        let decoded = decode(Message::Text("{\"op\":11}".to_owned()), None).unwrap();

        match decoded {
            Decoded::Payload(text) => assert_eq!(text, "{\"op\":11}"),
            _ => panic!("expected payload"),
        }
    }

    #[test]
    fn binary_without_compression_is_rejected() {
        assert!(decode(Message::Binary(vec![1, 2, 3]), None).is_err());
    }

    #[test]
    fn compressed_payload_roundtrips() {
        let payload = br#"{"op":0,"s":1,"t":"RESUMED","d":null}"#;
        let compressed = deflate(payload);
        assert!(compressed.ends_with(&ZLIB_SUFFIX));

        let mut inflater = Inflater::new();
        let decoded = decode(Message::Binary(compressed), Some(&mut inflater)).unwrap();

        match decoded {
            Decoded::Payload(text) => assert_eq!(text.as_bytes(), payload),
            _ => panic!("expected payload"),
        }
    }

    #[test]
    fn partial_frames_buffer_until_suffix() {
        let payload = br#"{"op":1,"d":42}"#;
        let compressed = deflate(payload);
        let (head, tail) = compressed.split_at(compressed.len() / 2);

        let mut inflater = Inflater::new();

        let first = decode(Message::Binary(head.to_vec()), Some(&mut inflater)).unwrap();
        assert!(matches!(first, Decoded::Nothing));

        let second = decode(Message::Binary(tail.to_vec()), Some(&mut inflater)).unwrap();

        match second {
            Decoded::Payload(text) => assert_eq!(text.as_bytes(), payload),
            _ => panic!("expected payload"),
        }
    }

    #[test]
    fn close_frames_carry_their_code() {
        use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};

        let message = Message::Close(Some(CloseFrame {
            code: CloseCode::Library(4000),
            reason: "".into(),
        }));

        match decode(message, None).unwrap() {
            Decoded::Close(Some(code)) => assert_eq!(code, 4000),
            _ => panic!("expected close"),
        }
    }
}
