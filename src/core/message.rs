//! Message and header types for the relay wire format.
//!
//! A frame on the wire is a 4-byte little-endian length prefix followed by
//! exactly that many payload bytes. The payload starts with a fixed 12-byte
//! header `(msg_id, sender_id, target_id)`; the rest is an opaque body whose
//! structure depends on `msg_id`.

use crate::config::MAX_FRAME_SIZE;
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Size of the fixed message header in bytes
pub const HEADER_LEN: usize = 12;

/// Fixed 12-byte prefix of every message payload.
///
/// `sender_id` as received from a client is untrusted; the router overwrites
/// it with the registry-assigned identity before the message goes anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Message kind, identifies body semantics
    pub msg_id: i32,
    /// Identity of the origin
    pub sender_id: i32,
    /// Routing destination: 0 = server, -1 = broadcast, otherwise a session id
    pub target_id: i32,
}

impl Header {
    /// Parse the first 12 bytes of a payload as a header.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::MalformedHeader(buf.len()));
        }

        Ok(Self {
            msg_id: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            sender_id: i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            target_id: i32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }

    /// Append the 12 header bytes to a buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.msg_id);
        buf.put_i32_le(self.sender_id);
        buf.put_i32_le(self.target_id);
    }
}

/// A decoded message: header plus opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub body: Bytes,
}

impl Message {
    /// Build a message from its parts.
    pub fn new(msg_id: i32, sender_id: i32, target_id: i32, body: Bytes) -> Self {
        Self {
            header: Header {
                msg_id,
                sender_id,
                target_id,
            },
            body,
        }
    }

    /// Split a raw frame payload into header and body.
    pub fn from_payload(payload: Bytes) -> Result<Self> {
        let header = Header::decode(&payload)?;
        Ok(Self {
            header,
            body: payload.slice(HEADER_LEN..),
        })
    }

    /// Serialize into a complete wire frame: length prefix, header, body.
    ///
    /// Fails when header + body does not fit in the signed 32-bit length
    /// prefix.
    pub fn encode(&self) -> Result<Bytes> {
        let payload_len = HEADER_LEN + self.body.len();
        if payload_len > i32::MAX as usize {
            return Err(ProtocolError::BodyTooLarge(self.body.len()));
        }

        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_LEN + payload_len);
        buf.put_i32_le(payload_len as i32);
        self.header.encode_into(&mut buf);
        buf.put_slice(&self.body);
        Ok(buf.freeze())
    }
}

/// Parse a 4-byte little-endian length prefix.
///
/// Rejects short input, negative lengths, and lengths above the frame cap.
pub fn decode_frame_length(buf: &[u8]) -> Result<usize> {
    if buf.len() < LENGTH_PREFIX_LEN {
        return Err(ProtocolError::MalformedLength(buf.len()));
    }

    let len = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if len < 0 {
        return Err(ProtocolError::InvalidLength(len));
    }
    if len as usize > MAX_FRAME_SIZE {
        return Err(ProtocolError::OversizedFrame(len as usize));
    }

    Ok(len as usize)
}
