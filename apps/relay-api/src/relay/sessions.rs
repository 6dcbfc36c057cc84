//! Active 1:1 chat sessions.

use std::collections::HashMap;

use tether_common::id::{prefix, prefixed_ulid};

/// Why a session operation was refused. Rejections are dropped by the
/// router without a protocol-level error; they are never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// The requested peer has no live connection.
    TargetOffline,
    /// A user cannot open a chat with themselves.
    SelfChat,
    /// One of the parties already belongs to an active session.
    Busy,
    /// The chat id does not name an active session the requester belongs to.
    UnknownSession,
}

struct ChatSession {
    participants: [String; 2],
}

impl ChatSession {
    fn other_participant(&self, user_id: &str) -> Option<&str> {
        let [a, b] = &self.participants;
        if a == user_id {
            Some(b)
        } else if b == user_id {
            Some(a)
        } else {
            None
        }
    }
}

/// Table of active sessions plus a user → session index.
///
/// Each user id appears in at most one session. Mutated only under the
/// relay's state lock, so simultaneous mutual start requests serialize and
/// the second observes `Busy`.
#[derive(Default)]
pub struct SessionTable {
    sessions: HashMap<String, ChatSession>,
    by_user: HashMap<String, String>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session between two distinct, unoccupied users and return
    /// its freshly generated id.
    pub fn start_session(&mut self, requester: &str, target: &str) -> Result<String, Rejected> {
        if requester == target {
            return Err(Rejected::SelfChat);
        }
        if self.by_user.contains_key(requester) || self.by_user.contains_key(target) {
            return Err(Rejected::Busy);
        }

        let chat_id = prefixed_ulid(prefix::CHAT);
        self.by_user.insert(requester.to_string(), chat_id.clone());
        self.by_user.insert(target.to_string(), chat_id.clone());
        self.sessions.insert(
            chat_id.clone(),
            ChatSession {
                participants: [requester.to_string(), target.to_string()],
            },
        );

        Ok(chat_id)
    }

    /// End a session on behalf of one of its participants. Returns the
    /// other participant so the caller can notify them. State is left
    /// unchanged on rejection.
    pub fn end_session(&mut self, chat_id: &str, requester: &str) -> Result<String, Rejected> {
        let other = self
            .sessions
            .get(chat_id)
            .ok_or(Rejected::UnknownSession)?
            .other_participant(requester)
            .ok_or(Rejected::UnknownSession)?
            .to_string();

        self.sessions.remove(chat_id);
        self.by_user.remove(requester);
        self.by_user.remove(&other);

        Ok(other)
    }

    /// Tear down every session involving `user_id` — at most one by
    /// invariant, tolerated as zero or more. Returns `(chat_id, other
    /// participant)` for each so the caller can notify the other side.
    pub fn end_sessions_for(&mut self, user_id: &str) -> Vec<(String, String)> {
        let involved: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.participants.iter().any(|p| p == user_id))
            .map(|(chat_id, _)| chat_id.clone())
            .collect();

        let mut ended = Vec::with_capacity(involved.len());
        for chat_id in involved {
            if let Some(session) = self.sessions.remove(&chat_id) {
                let [a, b] = session.participants;
                let other = if a == user_id { b } else { a };
                self.by_user.remove(user_id);
                self.by_user.remove(&other);
                ended.push((chat_id, other));
            }
        }
        ended
    }

    /// The session a user currently belongs to, if any.
    pub fn session_of(&self, user_id: &str) -> Option<&str> {
        self.by_user.get(user_id).map(String::as_str)
    }

    /// The counterpart of `user_id` in `chat_id`, if the session exists and
    /// the user is one of its participants.
    pub fn peer_of(&self, chat_id: &str, user_id: &str) -> Option<&str> {
        self.sessions.get(chat_id)?.other_participant(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_session_creates_distinct_pair() {
        let mut table = SessionTable::new();
        let chat_id = table.start_session("alice", "bob").unwrap();

        assert!(chat_id.starts_with("chat_"));
        assert_eq!(table.session_of("alice"), Some(chat_id.as_str()));
        assert_eq!(table.session_of("bob"), Some(chat_id.as_str()));
        assert_eq!(table.peer_of(&chat_id, "alice"), Some("bob"));
        assert_eq!(table.peer_of(&chat_id, "bob"), Some("alice"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn session_ids_are_unique() {
        let mut table = SessionTable::new();
        let first = table.start_session("alice", "bob").unwrap();
        table.end_session(&first, "alice").unwrap();
        let second = table.start_session("alice", "bob").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn rejects_chat_with_self() {
        let mut table = SessionTable::new();
        assert_eq!(
            table.start_session("alice", "alice"),
            Err(Rejected::SelfChat)
        );
        assert!(table.is_empty());
    }

    #[test]
    fn rejects_second_session_for_busy_requester() {
        let mut table = SessionTable::new();
        table.start_session("alice", "bob").unwrap();

        // A is already in a session with B; A -> C must fail.
        assert_eq!(table.start_session("alice", "carol"), Err(Rejected::Busy));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn rejects_session_with_busy_target() {
        let mut table = SessionTable::new();
        table.start_session("alice", "bob").unwrap();

        assert_eq!(table.start_session("carol", "bob"), Err(Rejected::Busy));
    }

    #[test]
    fn mutual_start_requests_serialize_first_wins() {
        let mut table = SessionTable::new();
        table.start_session("alice", "bob").unwrap();

        // Bob's simultaneous request lost the race for the lock.
        assert_eq!(table.start_session("bob", "alice"), Err(Rejected::Busy));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn end_session_returns_other_participant() {
        let mut table = SessionTable::new();
        let chat_id = table.start_session("alice", "bob").unwrap();

        let other = table.end_session(&chat_id, "bob").unwrap();
        assert_eq!(other, "alice");
        assert!(table.is_empty());
        assert_eq!(table.session_of("alice"), None);
        assert_eq!(table.session_of("bob"), None);
    }

    #[test]
    fn end_session_rejects_unknown_id_and_non_participant() {
        let mut table = SessionTable::new();
        let chat_id = table.start_session("alice", "bob").unwrap();

        assert_eq!(
            table.end_session("chat_bogus", "alice"),
            Err(Rejected::UnknownSession)
        );
        assert_eq!(
            table.end_session(&chat_id, "carol"),
            Err(Rejected::UnknownSession)
        );
        // Rejections leave the session intact.
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn end_sessions_for_tears_down_and_reports_counterpart() {
        let mut table = SessionTable::new();
        let chat_id = table.start_session("alice", "bob").unwrap();

        let ended = table.end_sessions_for("alice");
        assert_eq!(ended, vec![(chat_id, "bob".to_string())]);
        assert!(table.is_empty());

        // Both participants are free again.
        table.start_session("bob", "alice").unwrap();
    }

    #[test]
    fn end_sessions_for_tolerates_no_sessions() {
        let mut table = SessionTable::new();
        assert!(table.end_sessions_for("ghost").is_empty());
    }
}
