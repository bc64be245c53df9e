//! Session identity registry.
//!
//! Allocates monotonically increasing identities and maps each one to its
//! live session. This is the only state shared across connections; every
//! access goes through the single internal lock, and the lock is never held
//! while touching a socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tracing::debug;

use crate::protocol::FIRST_SESSION_ID;
use crate::service::session::Session;

/// Identity allocation plus the id → session routing table.
///
/// A session appears here exactly while it is eligible to receive forwarded
/// traffic: registration happens before the handshake, removal is the first
/// step of disconnect.
pub struct Registry {
    next_id: AtomicI32,
    sessions: RwLock<HashMap<i32, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(FIRST_SESSION_ID),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Hand out the next identity. Identities are never reused, even after
    /// the session disconnects.
    pub fn allocate(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Make a session routable under its identity.
    pub fn register(&self, session: Arc<Session>) {
        let id = session.id();
        self.write_sessions().insert(id, session);
        debug!(session_id = id, "Session registered");
    }

    /// Remove a session from routing. Returns false when the id was already
    /// gone, which makes double-disconnect a no-op.
    pub fn unregister(&self, id: i32) -> bool {
        let removed = self.write_sessions().remove(&id).is_some();
        if removed {
            debug!(session_id = id, "Session unregistered");
        }
        removed
    }

    pub fn lookup(&self, id: i32) -> Option<Arc<Session>> {
        self.read_sessions().get(&id).cloned()
    }

    /// Number of currently registered sessions.
    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_sessions().is_empty()
    }

    /// Visit every registered session other than the excluded one.
    ///
    /// Works on a snapshot of the table: a session disconnecting concurrently
    /// is either visited (and its send falls through to the idempotent
    /// disconnect) or already removed, never observed half-gone. The lock is
    /// released before any callback runs.
    pub fn for_each_except<F>(&self, excluded: i32, mut f: F)
    where
        F: FnMut(&Arc<Session>),
    {
        let snapshot: Vec<Arc<Session>> = self
            .read_sessions()
            .values()
            .filter(|s| s.id() != excluded)
            .cloned()
            .collect();

        for session in &snapshot {
            f(session);
        }
    }

    /// Send a pre-encoded frame to every registered session, optionally
    /// skipping one identity. The frame is encoded once by the caller and
    /// cheaply cloned per recipient.
    pub fn broadcast(&self, frame: &Bytes, exclude: Option<i32>) {
        // i32::MIN is outside the identity space, so excluding it excludes
        // nobody.
        let excluded = exclude.unwrap_or(i32::MIN);
        self.for_each_except(excluded, |session| {
            session.send_raw(frame.clone());
        });
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<i32, Arc<Session>>> {
        // A poisoned lock only means a panic elsewhere; the map itself is
        // still consistent.
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<i32, Arc<Session>>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
