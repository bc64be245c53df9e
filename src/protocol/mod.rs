//! # Relay Protocol
//!
//! Identity allocation, message routing, and the reserved protocol constants
//! shared by server and clients.
//!
//! ## Components
//! - **Registry**: session identity allocation and the id → session map
//! - **Router**: the single decision point for where an inbound message goes
//! - **Rpc**: decoding of remote-procedure bodies relayed between peers
//!
//! ## Reserved Identities
//! Identity `0` is the server and `-1` is the broadcast target; client
//! sessions are numbered upward from [`FIRST_SESSION_ID`].

pub mod registry;
pub mod router;
pub mod rpc;


use bytes::{BufMut, Bytes, BytesMut};

/// Identity of the server itself
pub const SERVER_ID: i32 = 0;

/// Pseudo-identity addressing every connected session
pub const BROADCAST_ID: i32 = -1;

/// First identity handed to a client session; keeps clear of the reserved ids
pub const FIRST_SESSION_ID: i32 = 100;

/// Message kinds understood by the relay.
///
/// Transform, spawn, and despawn bodies are opaque to the router; they exist
/// here so server and clients share one constant table.
pub mod msg {
    /// Keepalive ping/pong
    pub const PING: i32 = 0;
    /// Identity-assignment handshake
    pub const HELLO: i32 = 1;
    /// Transform/position sync
    pub const TRANSFORM: i32 = 2;
    /// Object spawn
    pub const SPAWN: i32 = 3;
    /// Object despawn
    pub const DESPAWN: i32 = 4;
    /// Remote procedure call
    pub const RPC: i32 = 5;
}

/// Body of the identity-assignment handshake sent to a freshly accepted
/// session: exactly the allocated identity.
pub fn hello_body(assigned_id: i32) -> Bytes {
    let mut body = BytesMut::with_capacity(4);
    body.put_i32_le(assigned_id);
    body.freeze()
}

/// Parse a hello body back into the assigned identity.
pub fn decode_hello(body: &[u8]) -> crate::error::Result<i32> {
    let mut cursor = crate::core::cursor::BodyCursor::new(body);
    cursor.read_i32("hello assigned id")
}
