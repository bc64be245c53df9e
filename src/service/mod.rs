//! # Relay Service
//!
//! The TCP-facing half of the relay: per-connection sessions and the
//! listening server that creates them.
//!
//! ## Components
//! - **Session**: one connected client (ordered outbound queue, receive loop,
//!   idempotent teardown)
//! - **Server**: accept loop, identity assignment, handshake, graceful shutdown

pub mod server;
pub mod session;
