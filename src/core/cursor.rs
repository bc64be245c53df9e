//! Bounds-checked read cursor for message bodies.
//!
//! Every read validates the remaining length first and returns
//! `ProtocolError::MalformedBody` on overrun, so a malformed body degrades to
//! a dropped message instead of a panic.

use crate::error::{ProtocolError, Result};

/// Sequential little-endian reader over a message body.
pub struct BodyCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BodyCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtocolError::MalformedBody(format!(
                "{what}: need {n} bytes, {} remaining",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_i32(&mut self, what: &str) -> Result<i32> {
        let b = self.take(4, what)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    /// Read a 4-byte length-prefixed UTF-8 string.
    pub fn read_string(&mut self, what: &str) -> Result<String> {
        let len = self.read_i32(what)?;
        if len < 0 {
            return Err(ProtocolError::MalformedBody(format!(
                "{what}: negative length {len}"
            )));
        }
        let bytes = self.take(len as usize, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ProtocolError::MalformedBody(format!("{what}: invalid UTF-8: {e}")))
    }

    /// Consume and return everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}
