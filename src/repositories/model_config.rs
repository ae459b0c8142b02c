//! Model configuration repository
//!
//! Handles owner-scoped CRUD for provider credential configurations. API
//! keys are encrypted before they reach this layer's create/update paths;
//! the repository only ever sees ciphertext.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::model_config::{self, Entity as ModelConfig};

/// Repository for model configuration database operations
#[derive(Debug, Clone)]
pub struct ModelConfigRepository {
    db: Arc<DatabaseConnection>,
}

impl ModelConfigRepository {
    /// Creates a new ModelConfigRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a new model configuration for an owner
    pub async fn create(
        &self,
        owner_id: Uuid,
        model_provider_id: Uuid,
        name: &str,
        api_key_ciphertext: Vec<u8>,
        is_default: bool,
    ) -> Result<model_config::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let active = model_config::ActiveModel {
            id: Set(id),
            owner_id: Set(owner_id),
            model_provider_id: Set(model_provider_id),
            name: Set(name.to_string()),
            api_key_ciphertext: Set(api_key_ciphertext),
            is_default: Set(is_default),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        active.insert(&*self.db).await?;

        let fetched = ModelConfig::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("model config not persisted"))
    }

    /// Finds a configuration by its ID without owner scoping
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<model_config::Model>> {
        Ok(ModelConfig::find_by_id(id).one(&*self.db).await?)
    }

    /// Lists all configurations for an owner ordered by creation time then ID
    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<model_config::Model>> {
        Ok(ModelConfig::find()
            .filter(model_config::Column::OwnerId.eq(owner_id))
            .order_by_asc(model_config::Column::CreatedAt)
            .order_by_asc(model_config::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Updates a configuration's fields
    ///
    /// `api_key_ciphertext` is only replaced when `Some`; the stored key is
    /// otherwise left untouched.
    pub async fn update(
        &self,
        id: Uuid,
        model_provider_id: Uuid,
        name: &str,
        api_key_ciphertext: Option<Vec<u8>>,
        is_default: bool,
    ) -> Result<model_config::Model> {
        let existing = ModelConfig::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("model config '{}' not found", id))?;

        let mut active: model_config::ActiveModel = existing.into();
        active.model_provider_id = Set(model_provider_id);
        active.name = Set(name.to_string());
        if let Some(ciphertext) = api_key_ciphertext {
            active.api_key_ciphertext = Set(ciphertext);
        }
        active.is_default = Set(is_default);
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&*self.db).await?)
    }

    /// Clears the default flag on all of an owner's configurations
    pub async fn clear_default_for_owner(&self, owner_id: Uuid) -> Result<u64> {
        let result = ModelConfig::update_many()
            .col_expr(
                model_config::Column::IsDefault,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(model_config::Column::OwnerId.eq(owner_id))
            .filter(model_config::Column::IsDefault.eq(true))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Deletes a configuration by ID, returning whether a row was removed
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = ModelConfig::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
