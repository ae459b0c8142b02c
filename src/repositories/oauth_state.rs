//! OAuth state repository
//!
//! Short-lived, single-use state records issued at the start of an OAuth
//! flow and consumed when the callback arrives.

use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::oauth_state::{self, Entity as OAuthState};

/// Repository for OAuth state database operations
#[derive(Debug, Clone)]
pub struct OAuthStateRepository {
    db: Arc<DatabaseConnection>,
}

impl OAuthStateRepository {
    /// Create a new OAuth state repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new OAuth state record
    ///
    /// `user_id` is set when an already-authenticated user starts the flow
    /// to link an additional identity; it is `None` for sign-in flows.
    pub async fn create(
        &self,
        state: &str,
        provider_slug: &str,
        user_id: Option<Uuid>,
        next: Option<String>,
        expires_in_minutes: i64,
    ) -> Result<oauth_state::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(expires_in_minutes);

        let active = oauth_state::ActiveModel {
            id: Set(id),
            state: Set(state.to_string()),
            provider_slug: Set(provider_slug.to_string()),
            user_id: Set(user_id),
            next: Set(next),
            expires_at: Set(expires_at.into()),
            created_at: Set(now.into()),
        };

        active.insert(&*self.db).await?;

        let fetched = OAuthState::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("oauth state not persisted"))
    }

    /// Find an unexpired OAuth state by its token
    pub async fn find_by_state(&self, state: &str) -> Result<Option<oauth_state::Model>> {
        Ok(OAuthState::find()
            .filter(oauth_state::Column::State.eq(state))
            .filter(oauth_state::Column::ExpiresAt.gt(Utc::now()))
            .one(&*self.db)
            .await?)
    }

    /// Find and consume an OAuth state (deleted after retrieval to prevent reuse)
    pub async fn consume(&self, state: &str) -> Result<Option<oauth_state::Model>> {
        let record = self.find_by_state(state).await?;

        if let Some(ref model) = record {
            let _ = OAuthState::delete_by_id(model.id).exec(&*self.db).await?;
        }

        Ok(record)
    }

    /// Clean up expired OAuth states
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = OAuthState::delete_many()
            .filter(oauth_state::Column::ExpiresAt.lt(Utc::now()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
