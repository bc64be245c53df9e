//! Tokio codec for length-prefixed relay frames.
//!
//! The decoder yields raw frame payloads (`Bytes`) rather than decoded
//! messages: a payload shorter than the 12-byte header is a skippable
//! condition for the session, not a stream-fatal one, so header decoding
//! happens above the codec. Length-prefix violations (negative, oversized)
//! are decode errors and terminate the stream.

use crate::config::MAX_FRAME_SIZE;
use crate::core::message::{decode_frame_length, Message, LENGTH_PREFIX_LEN};
use crate::error::ProtocolError;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Frame codec for the relay wire format.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Codec with a custom frame-size cap.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        // Validates sign and the global cap; the configured cap below may be
        // tighter.
        let payload_len = decode_frame_length(&src[..LENGTH_PREFIX_LEN])?;
        if payload_len > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(payload_len));
        }

        let frame_len = LENGTH_PREFIX_LEN + payload_len;
        if src.len() < frame_len {
            // Reserve for the rest of the frame so the next read fills it
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(frame_len);
        let payload = frame.split_off(LENGTH_PREFIX_LEN);
        Ok(Some(payload.freeze()))
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = msg.encode()?;
        dst.extend_from_slice(&frame);
        Ok(())
    }
}
