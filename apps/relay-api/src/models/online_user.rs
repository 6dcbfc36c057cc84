use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::schema::chat_users;

/// Insertable online-directory entry, written on connect. The directory is
/// write-only from the relay's point of view; "who is online" is answered
/// from the in-memory registry.
#[derive(Debug, Insertable)]
#[diesel(table_name = chat_users)]
pub struct NewOnlineUser<'a> {
    pub user_id: &'a str,
    pub name: &'a str,
    pub connected_at: DateTime<Utc>,
}
