//! # Session Relay
//!
//! Length-framed TCP message relay core for game session networking.
//!
//! Clients connect over a stream socket, are assigned a numeric identity, and
//! exchange length-framed messages that the server either answers itself,
//! forwards to one named peer, or broadcasts to all peers.
//!
//! ## Architecture
//! - **core**: wire format: frame codec, header, bounds-checked body cursor
//! - **protocol**: identity registry, router, RPC bodies, reserved constants
//! - **service**: per-connection sessions and the accepting server
//! - **utils**: logging and metrics
//!
//! ## Security
//! The router overwrites the client-asserted sender identity with the
//! registry-assigned one before a message goes anywhere: no forwarded or
//! server-handled message ever carries an identity the server did not itself
//! assign.
//!
//! ## Example
//! ```no_run
//! use session_relay::config::RelayConfig;
//! use session_relay::service::server::start_server;
//!
//! #[tokio::main]
//! async fn main() -> session_relay::error::Result<()> {
//!     let config = RelayConfig::from_env()?;
//!     start_server(&config).await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use config::RelayConfig;
pub use core::codec::FrameCodec;
pub use core::message::{Header, Message};
pub use error::{ProtocolError, Result};
pub use protocol::registry::Registry;
pub use protocol::router::Router;
pub use service::server::RelayServer;
pub use service::session::Session;
