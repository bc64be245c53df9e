//! Observability and Metrics
//!
//! This module provides metrics collection and observability features
//! for monitoring relay traffic and health.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for relay operations
#[derive(Debug)]
pub struct Metrics {
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Currently active sessions
    pub connections_active: AtomicU64,
    /// Total messages received from clients
    pub messages_received: AtomicU64,
    /// Total messages queued for delivery
    pub messages_sent: AtomicU64,
    /// Total bytes received
    pub bytes_received: AtomicU64,
    /// Total bytes queued for delivery
    pub bytes_sent: AtomicU64,
    /// Broadcast relays performed
    pub broadcasts_relayed: AtomicU64,
    /// Unicast relays performed
    pub unicasts_relayed: AtomicU64,
    /// RPC messages relayed to peers
    pub rpcs_relayed: AtomicU64,
    /// Ping messages answered
    pub pings_answered: AtomicU64,
    /// RPC bodies that failed to decode
    pub rpc_decode_failures: AtomicU64,
    /// Frames shorter than the fixed header, skipped
    pub frames_skipped: AtomicU64,
    /// Messages dropped (unknown kind, absent unicast target)
    pub messages_dropped: AtomicU64,
    /// Failed sends (queue or socket)
    pub send_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            broadcasts_relayed: AtomicU64::new(0),
            unicasts_relayed: AtomicU64::new(0),
            rpcs_relayed: AtomicU64::new(0),
            pings_answered: AtomicU64::new(0),
            rpc_decode_failures: AtomicU64::new(0),
            frames_skipped: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new connection
    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a message received
    pub fn message_received(&self, byte_count: u64) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a message queued for delivery
    pub fn message_sent(&self, byte_count: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a broadcast relay
    pub fn broadcast_relayed(&self) {
        self.broadcasts_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a unicast relay
    pub fn unicast_relayed(&self) {
        self.unicasts_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an RPC relay
    pub fn rpc_relayed(&self) {
        self.rpcs_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an answered ping
    pub fn ping_answered(&self) {
        self.pings_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an RPC body that failed to decode
    pub fn rpc_decode_failed(&self) {
        self.rpc_decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a skipped short frame
    pub fn frame_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped message
    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed send
    pub fn send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            broadcasts_relayed: self.broadcasts_relayed.load(Ordering::Relaxed),
            unicasts_relayed: self.unicasts_relayed.load(Ordering::Relaxed),
            rpcs_relayed: self.rpcs_relayed.load(Ordering::Relaxed),
            pings_answered: self.pings_answered.load(Ordering::Relaxed),
            rpc_decode_failures: self.rpc_decode_failures.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            messages_received = snapshot.messages_received,
            messages_sent = snapshot.messages_sent,
            bytes_received = snapshot.bytes_received,
            bytes_sent = snapshot.bytes_sent,
            broadcasts_relayed = snapshot.broadcasts_relayed,
            unicasts_relayed = snapshot.unicasts_relayed,
            rpcs_relayed = snapshot.rpcs_relayed,
            pings_answered = snapshot.pings_answered,
            rpc_decode_failures = snapshot.rpc_decode_failures,
            frames_skipped = snapshot.frames_skipped,
            messages_dropped = snapshot.messages_dropped,
            send_errors = snapshot.send_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Relay metrics"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub messages_received: u64,
    pub messages_sent: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub broadcasts_relayed: u64,
    pub unicasts_relayed: u64,
    pub rpcs_relayed: u64,
    pub pings_answered: u64,
    pub rpc_decode_failures: u64,
    pub frames_skipped: u64,
    pub messages_dropped: u64,
    pub send_errors: u64,
    pub uptime_seconds: u64,
}
