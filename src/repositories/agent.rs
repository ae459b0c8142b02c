//! Agent repository for database operations
//!
//! Agents are strictly owner-scoped: list and mutation paths filter on
//! `owner_id`, while `find_by_id` is unscoped so handlers can distinguish
//! a missing record (404) from someone else's record (403).

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::agent::{self, Entity as Agent};

/// Fields accepted when creating or updating an agent
#[derive(Debug, Clone, Default)]
pub struct AgentInput {
    pub name: String,
    pub is_public: bool,
    pub avatar_url: Option<String>,
    pub system_prompt: Option<String>,
    pub bio: Option<String>,
    pub lore: Option<String>,
    pub model_config_id: Option<Uuid>,
}

/// Repository for agent database operations
#[derive(Debug, Clone)]
pub struct AgentRepository {
    db: Arc<DatabaseConnection>,
}

impl AgentRepository {
    /// Creates a new AgentRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a new agent owned by the given user
    pub async fn create(&self, owner_id: Uuid, input: AgentInput) -> Result<agent::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let active = agent::ActiveModel {
            id: Set(id),
            owner_id: Set(owner_id),
            is_public: Set(input.is_public),
            name: Set(input.name),
            avatar_url: Set(input.avatar_url),
            system_prompt: Set(input.system_prompt),
            bio: Set(input.bio),
            lore: Set(input.lore),
            model_config_id: Set(input.model_config_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        active.insert(&*self.db).await?;

        let fetched = Agent::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("agent not persisted"))
    }

    /// Finds an agent by its ID without owner scoping
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<agent::Model>> {
        Ok(Agent::find_by_id(id).one(&*self.db).await?)
    }

    /// Lists all agents for an owner ordered by creation time then ID
    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<agent::Model>> {
        Ok(Agent::find()
            .filter(agent::Column::OwnerId.eq(owner_id))
            .order_by_asc(agent::Column::CreatedAt)
            .order_by_asc(agent::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Replaces an agent's editable fields
    pub async fn update(&self, id: Uuid, input: AgentInput) -> Result<agent::Model> {
        let existing = Agent::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("agent '{}' not found", id))?;

        let mut active: agent::ActiveModel = existing.into();
        active.name = Set(input.name);
        active.is_public = Set(input.is_public);
        active.avatar_url = Set(input.avatar_url);
        active.system_prompt = Set(input.system_prompt);
        active.bio = Set(input.bio);
        active.lore = Set(input.lore);
        active.model_config_id = Set(input.model_config_id);
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&*self.db).await?)
    }

    /// Updates only the avatar URL
    pub async fn set_avatar_url(&self, id: Uuid, avatar_url: Option<String>) -> Result<agent::Model> {
        let existing = Agent::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("agent '{}' not found", id))?;

        let mut active: agent::ActiveModel = existing.into();
        active.avatar_url = Set(avatar_url);
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&*self.db).await?)
    }

    /// Deletes an agent by ID, returning whether a row was removed
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = Agent::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
