use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use crate::db::pool::DbPool;
use crate::db::schema::chat_users;
use crate::error::ApiError;
use crate::models::online_user::NewOnlineUser;

/// Durable "who is online" directory: user id mapped to display name.
///
/// Backed by Postgres in production and an in-memory map in tests (or when
/// no `DATABASE_URL` is configured). Callers treat every write as
/// best-effort: the registry remains the source of truth, and the directory
/// self-heals through subsequent connect/disconnect calls.
#[async_trait]
pub trait OnlineDirectory: Send + Sync {
    async fn upsert(&self, user_id: &str, name: &str) -> Result<(), ApiError>;
    async fn remove(&self, user_id: &str) -> Result<(), ApiError>;
    /// Wipe all entries. The directory only reflects connections of the
    /// current process, so startup begins from a clean table.
    async fn clear(&self) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

pub struct PgDirectory {
    pool: DbPool,
}

impl PgDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OnlineDirectory for PgDirectory {
    async fn upsert(&self, user_id: &str, name: &str) -> Result<(), ApiError> {
        let now = Utc::now();
        let mut conn = self.pool.get().await?;

        let query = diesel::insert_into(chat_users::table)
            .values(NewOnlineUser {
                user_id,
                name,
                connected_at: now,
            })
            .on_conflict(chat_users::user_id)
            .do_update()
            .set((
                chat_users::name.eq(name),
                chat_users::connected_at.eq(now),
            ));

        diesel_async::RunQueryDsl::execute(query, &mut conn).await?;

        Ok(())
    }

    async fn remove(&self, user_id: &str) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;

        let query =
            diesel::delete(chat_users::table.filter(chat_users::user_id.eq(user_id)));
        diesel_async::RunQueryDsl::execute(query, &mut conn).await?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;

        diesel_async::RunQueryDsl::execute(diesel::delete(chat_users::table), &mut conn)
            .await?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests / no configured database)
// ---------------------------------------------------------------------------

pub struct MemoryDirectory {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.data.lock().unwrap().contains_key(user_id)
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OnlineDirectory for MemoryDirectory {
    async fn upsert(&self, user_id: &str, name: &str) -> Result<(), ApiError> {
        self.data
            .lock()
            .unwrap()
            .insert(user_id.to_string(), name.to_string());
        Ok(())
    }

    async fn remove(&self, user_id: &str) -> Result<(), ApiError> {
        self.data.lock().unwrap().remove(user_id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ApiError> {
        self.data.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_directory_tracks_connects_and_disconnects() {
        let dir = MemoryDirectory::new();

        dir.upsert("u1", "Alice").await.unwrap();
        assert!(dir.contains("u1"));

        // Reconnect under the same id refreshes the entry, no duplicate.
        dir.upsert("u1", "Alice").await.unwrap();
        assert_eq!(dir.data.lock().unwrap().len(), 1);

        dir.remove("u1").await.unwrap();
        assert!(!dir.contains("u1"));

        // Removing an absent entry is a no-op.
        dir.remove("u1").await.unwrap();
    }

    #[tokio::test]
    async fn clear_empties_the_directory() {
        let dir = MemoryDirectory::new();
        dir.upsert("u1", "Alice").await.unwrap();
        dir.upsert("u2", "Bob").await.unwrap();

        dir.clear().await.unwrap();
        assert!(!dir.contains("u1"));
        assert!(!dir.contains("u2"));
    }
}
