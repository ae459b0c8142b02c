//! User repository for database operations

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::user::{self, Entity as User};

/// Repository for user database operations
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Creates a new UserRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a new user record
    pub async fn create(
        &self,
        email: Option<String>,
        display_name: Option<String>,
    ) -> Result<user::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let active = user::ActiveModel {
            id: Set(id),
            email: Set(email),
            display_name: Set(display_name),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        active.insert(&*self.db).await?;

        let fetched = User::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("user not persisted"))
    }

    /// Finds a user by its ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>> {
        Ok(User::find_by_id(id).one(&*self.db).await?)
    }

    /// Updates a user's profile fields
    pub async fn update_profile(
        &self,
        id: Uuid,
        email: Option<String>,
        display_name: Option<String>,
    ) -> Result<user::Model> {
        let existing = User::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("user '{}' not found", id))?;

        let mut active: user::ActiveModel = existing.into();
        if email.is_some() {
            active.email = Set(email);
        }
        if display_name.is_some() {
            active.display_name = Set(display_name);
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&*self.db).await?)
    }
}
