//! Message routing.
//!
//! The router is the single decision point for every decoded inbound message:
//! it stamps the true sender identity over whatever the client claimed, then
//! hands the message to the server-side handler, one named peer, or every
//! peer. Nothing in here is fatal to the server; the worst outcome for bad
//! input is a dropped message or a dropped connection.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::core::message::{Header, Message};
use crate::protocol::registry::Registry;
use crate::protocol::rpc::RpcCall;
use crate::protocol::{msg, BROADCAST_ID, SERVER_ID};
use crate::service::session::Session;
use crate::utils::metrics::Metrics;

/// Whether a broadcast loops back to the session that originated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastScope {
    /// Deliver to everyone, the originator included
    IncludeSender,
    /// Deliver to everyone except the originator
    ExcludeSender,
}

/// Per-message-kind broadcast policy.
///
/// Ping relays bounce to everyone so all peers observe liveness; everything
/// else stays away from its originator.
pub fn broadcast_scope(msg_id: i32) -> BroadcastScope {
    match msg_id {
        msg::PING => BroadcastScope::IncludeSender,
        _ => BroadcastScope::ExcludeSender,
    }
}

/// Routes decoded messages between sessions.
pub struct Router {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Router {
    pub fn new(registry: Arc<Registry>, metrics: Arc<Metrics>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Route one inbound message from `sender`.
    ///
    /// The claimed sender identity is discarded before anything else: no
    /// forwarded or server-handled message ever carries an identity the
    /// server did not itself assign.
    pub fn route(&self, sender: &Arc<Session>, header: Header, body: Bytes) {
        let header = Header {
            sender_id: sender.id(),
            ..header
        };

        match header.target_id {
            SERVER_ID => self.handle_server_message(sender, header, body),
            BROADCAST_ID => self.relay_broadcast(sender, header, body),
            target => self.relay_unicast(sender, header, body, target),
        }
    }

    /// Messages addressed to the server itself.
    fn handle_server_message(&self, sender: &Arc<Session>, header: Header, body: Bytes) {
        match header.msg_id {
            msg::PING => {
                // Bounce the body back so clients can carry a timestamp
                sender.send_packet(msg::PING, sender.id(), body);
                self.metrics.ping_answered();
            }
            msg::RPC => self.relay_rpc(sender, body),
            other => {
                debug!(
                    msg_id = other,
                    session_id = sender.id(),
                    "Unhandled message kind addressed to server, dropping"
                );
                self.metrics.message_dropped();
            }
        }
    }

    /// An authority-relayed call: validate the body, then re-broadcast it to
    /// every other session with the corrected sender and a broadcast target.
    fn relay_rpc(&self, sender: &Arc<Session>, body: Bytes) {
        let call = match RpcCall::decode(&body) {
            Ok(call) => call,
            Err(e) => {
                warn!(
                    session_id = sender.id(),
                    error = %e,
                    "Malformed RPC body, dropping"
                );
                self.metrics.rpc_decode_failed();
                return;
            }
        };

        debug!(
            session_id = sender.id(),
            net_id = call.net_id,
            method = %call.method,
            arg_count = call.arg_count,
            "Relaying RPC"
        );

        let relayed = Message::new(msg::RPC, sender.id(), BROADCAST_ID, body);
        match relayed.encode() {
            Ok(frame) => {
                self.registry.broadcast(&frame, Some(sender.id()));
                self.metrics.rpc_relayed();
            }
            Err(e) => warn!(session_id = sender.id(), error = %e, "RPC re-encode failed"),
        }
    }

    /// Client-initiated broadcast: one encode, one frame for all recipients.
    fn relay_broadcast(&self, sender: &Arc<Session>, header: Header, body: Bytes) {
        let message = Message { header, body };
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(session_id = sender.id(), error = %e, "Broadcast encode failed");
                return;
            }
        };

        let exclude = match broadcast_scope(header.msg_id) {
            BroadcastScope::IncludeSender => None,
            BroadcastScope::ExcludeSender => Some(sender.id()),
        };

        self.registry.broadcast(&frame, exclude);
        self.metrics.broadcast_relayed();
    }

    /// Forward to one named peer. An absent target is a normal race with
    /// disconnect, not an error; the sender is not notified.
    fn relay_unicast(&self, sender: &Arc<Session>, header: Header, body: Bytes, target: i32) {
        let Some(peer) = self.registry.lookup(target) else {
            debug!(
                session_id = sender.id(),
                target_id = target,
                "Unicast target not registered, dropping"
            );
            self.metrics.message_dropped();
            return;
        };

        let message = Message { header, body };
        match message.encode() {
            Ok(frame) => {
                peer.send_raw(frame);
                self.metrics.unicast_relayed();
            }
            Err(e) => warn!(session_id = sender.id(), error = %e, "Unicast encode failed"),
        }
    }
}
