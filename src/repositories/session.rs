//! Session repository for database operations
//!
//! Sessions are stored as a SHA-256 hash of the opaque bearer token, so a
//! database read never exposes a usable credential.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::session::{self, Entity as Session};

/// Repository for session database operations
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: Arc<DatabaseConnection>,
}

impl SessionRepository {
    /// Creates a new SessionRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a new session record for a user
    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<session::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let active = session::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            token_hash: Set(token_hash.to_string()),
            expires_at: Set(expires_at.into()),
            created_at: Set(now.into()),
        };

        active.insert(&*self.db).await?;

        let fetched = Session::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("session not persisted"))
    }

    /// Finds a session by token hash
    pub async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<session::Model>> {
        Ok(Session::find()
            .filter(session::Column::TokenHash.eq(token_hash))
            .one(&*self.db)
            .await?)
    }

    /// Deletes a session by ID, returning whether a row was removed
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = Session::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Deletes all sessions for a user
    pub async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = Session::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Removes expired sessions
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = Session::delete_many()
            .filter(session::Column::ExpiresAt.lt(Utc::now()))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
