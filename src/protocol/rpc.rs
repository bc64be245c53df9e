//! Remote-procedure message bodies.
//!
//! The relay decodes enough of an RPC body to know it is well-formed (target
//! object, method name, argument count) and relays the argument bytes
//! untouched. Argument values are a client-side concern.

use crate::core::cursor::BodyCursor;
use crate::error::Result;
use bytes::{BufMut, Bytes, BytesMut};

/// A decoded RPC relay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCall {
    /// Network id of the object the call targets
    pub net_id: i32,
    /// Method name to invoke on the target
    pub method: String,
    /// Declared number of arguments
    pub arg_count: u8,
    /// Raw argument bytes, relayed opaquely
    pub args: Bytes,
}

impl RpcCall {
    /// Decode an RPC body: `net_id (i32), method (len-prefixed UTF-8),
    /// arg_count (u8), args (rest)`.
    pub fn decode(body: &Bytes) -> Result<Self> {
        let mut cursor = BodyCursor::new(body);

        let net_id = cursor.read_i32("rpc net id")?;
        let method = cursor.read_string("rpc method name")?;
        let arg_count = cursor.read_u8("rpc arg count")?;
        let args = Bytes::copy_from_slice(cursor.rest());

        Ok(Self {
            net_id,
            method,
            arg_count,
            args,
        })
    }

    /// Serialize back into body bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + 4 + self.method.len() + 1 + self.args.len());
        buf.put_i32_le(self.net_id);
        buf.put_i32_le(self.method.len() as i32);
        buf.put_slice(self.method.as_bytes());
        buf.put_u8(self.arg_count);
        buf.put_slice(&self.args);
        buf.freeze()
    }
}
