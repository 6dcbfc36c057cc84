//! Event routing: translates inbound client events into registry/session
//! mutations and outbound events to the right connections.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::db::directory::OnlineDirectory;

use super::events::{ClientEvent, OnlineUser, ServerEvent};
use super::presence;
use super::registry::{ConnectionRegistry, OutboundSender};
use super::sessions::{Rejected, SessionTable};

/// Registry and session table behind the relay's single serialization
/// point. Every presence/session invariant holds because all mutations take
/// this one lock.
#[derive(Default)]
struct RelayState {
    registry: ConnectionRegistry,
    sessions: SessionTable,
}

/// The connection/session manager.
///
/// Owns all live state. The online directory is written best-effort outside
/// the lock; its failures never affect relay state.
pub struct Relay {
    state: Mutex<RelayState>,
    directory: Arc<dyn OnlineDirectory>,
}

impl Relay {
    pub fn new(directory: Arc<dyn OnlineDirectory>) -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            directory,
        }
    }

    /// Register a connection and broadcast the new presence list. A prior
    /// connection under the same user id is evicted and silently closed;
    /// its sessions stay intact since the identity never went offline.
    pub async fn connect(&self, user_id: &str, name: &str, conn_id: &str, sender: OutboundSender) {
        let evicted = {
            let mut state = self.state.lock();
            let evicted = state.registry.register(user_id, name, conn_id, sender);
            presence::broadcast_online_users(&state.registry);
            evicted
        };
        if evicted.is_some() {
            tracing::info!(%user_id, "evicted prior connection for reconnecting identity");
        }

        if let Err(err) = self.directory.upsert(user_id, name).await {
            tracing::warn!(?err, %user_id, "online directory upsert failed");
        }

        tracing::info!(%user_id, %name, "connection established");
    }

    /// Tear down a connection: unregister, end its sessions, notify each
    /// counterpart, rebroadcast presence. A stale `conn_id` (a connection
    /// that was already replaced) is a complete no-op — the identity is
    /// still online on its successor.
    pub async fn disconnect(&self, user_id: &str, conn_id: &str) {
        {
            let mut state = self.state.lock();
            if !state.registry.unregister(user_id, conn_id) {
                tracing::debug!(%user_id, "stale disconnect ignored");
                return;
            }
            for (chat_id, other) in state.sessions.end_sessions_for(user_id) {
                if let Some(entry) = state.registry.lookup(&other) {
                    entry.send(ServerEvent::UserLeftChat { chat_id });
                }
            }
            presence::broadcast_online_users(&state.registry);
        }

        if let Err(err) = self.directory.remove(user_id).await {
            tracing::warn!(?err, %user_id, "online directory removal failed");
        }

        tracing::info!(%user_id, "connection closed");
    }

    /// Dispatch one inbound event. Precondition violations drop the event
    /// with no state change and no protocol-level error response.
    pub fn handle_event(&self, user_id: &str, event: ClientEvent) {
        let mut state = self.state.lock();
        match event {
            ClientEvent::StartChat { target_user_id } => {
                if !state.registry.contains(&target_user_id) {
                    reject(user_id, "start_chat", Rejected::TargetOffline);
                    return;
                }
                let chat_id = match state.sessions.start_session(user_id, &target_user_id) {
                    Ok(chat_id) => chat_id,
                    Err(rejected) => {
                        reject(user_id, "start_chat", rejected);
                        return;
                    }
                };

                let participants: Vec<OnlineUser> = [user_id, target_user_id.as_str()]
                    .iter()
                    .filter_map(|uid| {
                        state.registry.lookup(uid).map(|entry| OnlineUser {
                            user_id: (*uid).to_string(),
                            name: entry.name.clone(),
                        })
                    })
                    .collect();
                let started = ServerEvent::ChatStarted {
                    chat_id: chat_id.clone(),
                    participants,
                };
                for uid in [user_id, target_user_id.as_str()] {
                    if let Some(entry) = state.registry.lookup(uid) {
                        entry.send(started.clone());
                    }
                }

                tracing::info!(%chat_id, requester = %user_id, target = %target_user_id, "chat session started");
            }

            ClientEvent::ChatMessage { chat_id, content } => {
                let Some(other) = state.sessions.peer_of(&chat_id, user_id).map(str::to_string)
                else {
                    reject(user_id, "chat_message", Rejected::UnknownSession);
                    return;
                };
                let Some(sender_name) = state.registry.lookup(user_id).map(|e| e.name.clone())
                else {
                    return;
                };

                let message = ServerEvent::ChatMessage {
                    chat_id,
                    sender_id: user_id.to_string(),
                    sender_name,
                    content,
                    timestamp: Utc::now(),
                };
                // Echoed to the sender as well as the peer; message content
                // is never retained past this dispatch.
                for uid in [user_id, other.as_str()] {
                    if let Some(entry) = state.registry.lookup(uid) {
                        entry.send(message.clone());
                    }
                }
            }

            ClientEvent::EndChat { chat_id } => match state.sessions.end_session(&chat_id, user_id)
            {
                Ok(other) => {
                    if let Some(entry) = state.registry.lookup(user_id) {
                        entry.send(ServerEvent::ChatEnded {
                            chat_id: chat_id.clone(),
                        });
                    }
                    if let Some(entry) = state.registry.lookup(&other) {
                        entry.send(ServerEvent::UserLeftChat {
                            chat_id: chat_id.clone(),
                        });
                    }
                    tracing::info!(%chat_id, ended_by = %user_id, "chat session ended");
                }
                Err(rejected) => reject(user_id, "end_chat", rejected),
            },
        }
    }

    /// Registry snapshot for the non-realtime query surface.
    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.state.lock().registry.online_users()
    }
}

fn reject(user_id: &str, event: &str, rejected: Rejected) {
    tracing::debug!(%user_id, event, ?rejected, "event dropped");
}
