//! Presence publisher: pushes the online-user list to every connection.

use super::events::ServerEvent;
use super::registry::ConnectionRegistry;

/// Push an `online_users` event to every live connection. Each recipient's
/// copy excludes their own identity.
///
/// Called under the relay state lock on every registry membership change. A
/// snapshot raced by a concurrent change is corrected by the broadcast that
/// change itself triggers; no retraction is sent.
pub fn broadcast_online_users(registry: &ConnectionRegistry) {
    let users = registry.online_users();
    for (user_id, entry) in registry.iter() {
        let visible = users
            .iter()
            .filter(|user| &user.user_id != user_id)
            .cloned()
            .collect();
        entry.send(ServerEvent::OnlineUsers { users: visible });
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::relay::events::OnlineUser;

    fn add(registry: &mut ConnectionRegistry, user: &str) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(user, user, &format!("conn_{user}"), tx);
        rx
    }

    fn last_online_users(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<OnlineUser> {
        let mut latest = None;
        while let Ok(event) = rx.try_recv() {
            if let ServerEvent::OnlineUsers { users } = event {
                latest = Some(users);
            }
        }
        latest.expect("no online_users event received")
    }

    #[test]
    fn every_connection_receives_list_excluding_itself() {
        let mut registry = ConnectionRegistry::new();
        let mut alice_rx = add(&mut registry, "alice");
        let mut bob_rx = add(&mut registry, "bob");

        broadcast_online_users(&registry);

        let alice_sees = last_online_users(&mut alice_rx);
        assert_eq!(alice_sees.len(), 1);
        assert_eq!(alice_sees[0].user_id, "bob");

        let bob_sees = last_online_users(&mut bob_rx);
        assert_eq!(bob_sees.len(), 1);
        assert_eq!(bob_sees[0].user_id, "alice");
    }

    #[test]
    fn repeated_broadcasts_are_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let mut alice_rx = add(&mut registry, "alice");
        let mut bob_rx = add(&mut registry, "bob");

        broadcast_online_users(&registry);
        broadcast_online_users(&registry);

        assert_eq!(last_online_users(&mut alice_rx).len(), 1);
        assert_eq!(last_online_users(&mut bob_rx).len(), 1);
    }

    #[test]
    fn sole_connection_gets_an_empty_list() {
        let mut registry = ConnectionRegistry::new();
        let mut alice_rx = add(&mut registry, "alice");

        broadcast_online_users(&registry);

        assert!(last_online_users(&mut alice_rx).is_empty());
    }
}
