//! Identity repository for database operations
//!
//! Identities link a local user to an external OAuth account. The
//! `(provider_slug, external_id)` pair is unique across all users.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::identity::{self, Entity as Identity};

/// Repository for identity database operations
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    db: Arc<DatabaseConnection>,
}

impl IdentityRepository {
    /// Creates a new IdentityRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a new identity record linking a user to an external account
    pub async fn create(
        &self,
        user_id: Uuid,
        provider_slug: &str,
        external_id: &str,
    ) -> Result<identity::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let active = identity::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            provider_slug: Set(provider_slug.to_string()),
            external_id: Set(external_id.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        active.insert(&*self.db).await?;

        let fetched = Identity::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("identity not persisted"))
    }

    /// Finds an identity by its unique `(provider, external_id)` pair
    pub async fn find_by_provider(
        &self,
        provider_slug: &str,
        external_id: &str,
    ) -> Result<Option<identity::Model>> {
        Ok(Identity::find()
            .filter(identity::Column::ProviderSlug.eq(provider_slug))
            .filter(identity::Column::ExternalId.eq(external_id))
            .one(&*self.db)
            .await?)
    }

    /// Lists identities for a user ordered by creation time
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<identity::Model>> {
        Ok(Identity::find()
            .filter(identity::Column::UserId.eq(user_id))
            .order_by_asc(identity::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Counts identities linked to a user
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<u64> {
        Ok(Identity::find()
            .filter(identity::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await?)
    }

    /// Finds a user's identity by its ID
    pub async fn find_for_user(
        &self,
        user_id: Uuid,
        identity_id: Uuid,
    ) -> Result<Option<identity::Model>> {
        Ok(Identity::find_by_id(identity_id)
            .filter(identity::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?)
    }

    /// Deletes an identity by ID, returning whether a row was removed
    pub async fn delete(&self, identity_id: Uuid) -> Result<bool> {
        let result = Identity::delete_by_id(identity_id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
