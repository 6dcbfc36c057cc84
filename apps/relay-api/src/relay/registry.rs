//! Live connection registry: the in-memory source of truth for presence.

use std::collections::HashMap;

use tokio::sync::mpsc;

use super::events::{OnlineUser, ServerEvent};

/// Per-connection outbound queue. Sends never block; a closed queue means
/// the connection task has already exited.
pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;

/// A live connection bound to one user identity.
pub struct ConnectionEntry {
    /// Identifies this physical connection. A reconnect under the same user
    /// id gets a fresh conn_id, so late cleanup from a replaced connection
    /// can be told apart from the live one.
    pub conn_id: String,
    pub name: String,
    pub sender: OutboundSender,
}

impl ConnectionEntry {
    /// Queue an event for delivery. A send to a closed queue is ignored:
    /// the owning task is already tearing the connection down.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Holds at most one live connection per user id. Mutated only under the
/// relay's state lock.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, evicting any prior connection for the same
    /// user id. The evicted entry is returned so the caller can drop it,
    /// silently closing the old socket.
    pub fn register(
        &mut self,
        user_id: &str,
        name: &str,
        conn_id: &str,
        sender: OutboundSender,
    ) -> Option<ConnectionEntry> {
        self.connections.insert(
            user_id.to_string(),
            ConnectionEntry {
                conn_id: conn_id.to_string(),
                name: name.to_string(),
                sender,
            },
        )
    }

    /// Remove the connection, but only if `conn_id` still identifies the
    /// live entry. Returns whether anything was removed.
    pub fn unregister(&mut self, user_id: &str, conn_id: &str) -> bool {
        match self.connections.get(user_id) {
            Some(entry) if entry.conn_id == conn_id => {
                self.connections.remove(user_id);
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, user_id: &str) -> Option<&ConnectionEntry> {
        self.connections.get(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    /// Snapshot of everyone currently online.
    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.connections
            .iter()
            .map(|(user_id, entry)| OnlineUser {
                user_id: user_id.clone(),
                name: entry.name.clone(),
            })
            .collect()
    }

    /// Iterate over live connections (used by the presence publisher).
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConnectionEntry)> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
