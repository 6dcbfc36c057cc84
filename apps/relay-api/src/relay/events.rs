//! Wire-format events exchanged over the relay WebSocket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as seen in online lists and chat participant lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    pub user_id: String,
    pub name: String,
}

/// Client → server events.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    StartChat { target_user_id: String },
    ChatMessage { chat_id: String, content: String },
    EndChat { chat_id: String },
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    OnlineUsers {
        users: Vec<OnlineUser>,
    },
    ChatStarted {
        chat_id: String,
        participants: Vec<OnlineUser>,
    },
    ChatMessage {
        chat_id: String,
        sender_id: String,
        sender_name: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
    ChatEnded {
        chat_id: String,
    },
    UserLeftChat {
        chat_id: String,
    },
}
